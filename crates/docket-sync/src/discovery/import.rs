//! Turn a discovery outcome into planned epic/feature writes.

use docket_core::keys::{is_epic_key, is_feature_key};
use docket_db::updates::plan::{PlanUpdate, PlanUpdateBuilder};
use docket_db::service::DocketService;

use super::{DiscoveredEntity, DiscoveryOutcome};
use crate::error::SyncError;
use crate::plan::{Plan, Write};
use crate::report::DiscoveryReport;

/// Fields of `found` that differ from the stored values.
///
/// Only values discovery actually supplied are compared; a blank title or a
/// missing description never clears stored data.
fn metadata_update(
    found: &DiscoveredEntity,
    title: &str,
    description: Option<&str>,
    file_path: Option<&str>,
) -> PlanUpdate {
    let mut builder = PlanUpdateBuilder::new();
    if !found.title.trim().is_empty() && found.title != title {
        builder = builder.title(found.title.clone());
    }
    if let Some(new) = found.description.as_deref()
        && Some(new) != description
    {
        builder = builder.description(Some(new.to_string()));
    }
    if let Some(new) = found.file_path.as_deref()
        && Some(new) != file_path
    {
        builder = builder.file_path(Some(new.to_string()));
    }
    builder.build()
}

/// Plan creates/updates for every discovered epic and feature.
pub(crate) async fn plan_import(
    service: &DocketService,
    outcome: &DiscoveryOutcome,
    plan: &mut Plan,
    report: &mut DiscoveryReport,
) -> Result<(), SyncError> {
    for epic in &outcome.epics {
        if !is_epic_key(&epic.key) {
            report.warn(format!("Skipping epic with invalid key '{}'", epic.key));
            continue;
        }
        match service.find_epic_by_key(&epic.key).await? {
            None => {
                plan.push(Write::CreateEpic {
                    key: epic.key.clone(),
                    title: epic.title.clone(),
                    description: epic.description.clone(),
                    file_path: epic.file_path.clone(),
                });
                report.epics_imported += 1;
            }
            Some(stored) => {
                plan.confirm_epic(&epic.key);
                let update = metadata_update(
                    epic,
                    &stored.title,
                    stored.description.as_deref(),
                    stored.file_path.as_deref(),
                );
                if !update.is_empty() {
                    plan.push(Write::UpdateEpic {
                        key: epic.key.clone(),
                        update,
                    });
                    report.epics_updated += 1;
                }
            }
        }
    }

    for feature in &outcome.features {
        if !is_feature_key(&feature.key) {
            report.warn(format!("Skipping feature with invalid key '{}'", feature.key));
            continue;
        }
        let Some(epic_key) = feature.parent_key.as_deref() else {
            report.warn(format!("Skipping feature {} with no epic", feature.key));
            continue;
        };
        if !plan.has_epic(epic_key) && service.find_epic_by_key(epic_key).await?.is_none() {
            report.warn(format!(
                "Skipping feature {}: epic {epic_key} was not discovered and is not in the store",
                feature.key
            ));
            continue;
        }

        match service.find_feature_by_key(&feature.key).await? {
            None => {
                plan.push(Write::CreateFeature {
                    epic_key: epic_key.to_string(),
                    key: feature.key.clone(),
                    title: feature.title.clone(),
                    description: feature.description.clone(),
                    file_path: feature.file_path.clone(),
                });
                report.features_imported += 1;
            }
            Some(stored) => {
                plan.confirm_feature(&feature.key);
                let update = metadata_update(
                    feature,
                    &stored.title,
                    stored.description.as_deref(),
                    stored.file_path.as_deref(),
                );
                if !update.is_empty() {
                    plan.push(Write::UpdateFeature {
                        key: feature.key.clone(),
                        update,
                    });
                    report.features_updated += 1;
                }
            }
        }
    }
    Ok(())
}
