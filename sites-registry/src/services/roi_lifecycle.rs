//! ROI lifecycle
//!
//! States: Active, Legacy (superseded, kept for audit), Archived (soft
//! removed). Geometry changes take one of three paths:
//!
//! - **Normal update**: small in-place correction, `timeseries_broken` untouched
//! - **Admin override**: in-place change that raises `timeseries_broken`
//! - **Legacy workflow**: the ROI becomes Legacy and an optional replacement
//!   is created in the same transaction, linked through `replaced_by_roi_id`
//!
//! Only the ROI-editor roles may mutate geometry directly. This is stricter
//! than the ownership scope used for stations, platforms, and instruments.

use crate::db::is_unique_violation;
use crate::db::rois::{self as store, NewRoi, RoiUpdate};
use crate::services::creation::create_with_unique_name;
use crate::services::instruments::instrument_with_station;
use crate::services::sequence::next_sequence;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sites_common::db::{
    validate_geometry, validate_style, EditMode, GeometryPoint, Roi, RoiColor, RoiState, Station,
};
use sites_common::naming::{roi_name, ROI_PREFIX};
use sites_common::{Caller, EntityKind, Error, Result};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const DEFAULT_ALPHA: f64 = 0.3;
const DEFAULT_THICKNESS: i64 = 7;

/// ROI creation payload, also used for the replacement in the legacy workflow
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoiRequest {
    pub points: Vec<GeometryPoint>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<RoiColor>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub thickness: Option<i64>,
    #[serde(default)]
    pub source_image: Option<String>,
    #[serde(default)]
    pub auto_generated: bool,
}

impl CreateRoiRequest {
    fn validate(&self) -> Result<()> {
        validate_geometry(&self.points).map_err(Error::Validation)?;
        validate_style(
            self.alpha.unwrap_or(DEFAULT_ALPHA),
            self.thickness.unwrap_or(DEFAULT_THICKNESS),
        )
        .map_err(Error::Validation)
    }

    fn into_new_roi(self, instrument_id: i64, roi_name: String) -> NewRoi {
        NewRoi {
            instrument_id,
            roi_name,
            description: self.description,
            points: self.points,
            color: self.color.unwrap_or_default(),
            alpha: self.alpha.unwrap_or(DEFAULT_ALPHA),
            thickness: self.thickness.unwrap_or(DEFAULT_THICKNESS),
            source_image: self.source_image,
            auto_generated: self.auto_generated,
        }
    }
}

/// Mark-as-legacy payload
#[derive(Debug, Clone, Deserialize)]
pub struct MarkLegacyRequest {
    pub reason: String,
    /// Replacement created atomically with the transition
    #[serde(default)]
    pub replacement: Option<CreateRoiRequest>,
}

/// Outcome of the legacy transition
#[derive(Debug, Clone, Serialize)]
pub struct LegacyTransition {
    pub legacy: Roi,
    pub replacement: Option<Roi>,
}

/// Edit-mode answer for one caller and ROI
#[derive(Debug, Clone, Serialize)]
pub struct EditModeView {
    pub roi_id: i64,
    pub state: RoiState,
    pub edit_mode: EditMode,
}

/// A ROI with its legacy predecessors (most recent first) and direct replacement
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementChain {
    pub current: Roi,
    pub predecessors: Vec<Roi>,
    pub replacement: Option<Roi>,
}

/// Decide how a caller may change a ROI.
///
/// **Behavior:**
/// - Legacy or Archived: `ReadOnly` for everyone
/// - Active + ROI editor: `DirectEdit`
/// - Active + write access to the owning station: `RequiresLegacyWorkflow`
/// - Active otherwise: `ReadOnly`
///
/// Never returns `DirectEdit` for a caller outside the editor set.
pub fn edit_mode(state: RoiState, is_privileged: bool, can_write_station: bool) -> EditMode {
    match state {
        RoiState::Legacy | RoiState::Archived => EditMode::ReadOnly,
        RoiState::Active if is_privileged => EditMode::DirectEdit,
        RoiState::Active if can_write_station => EditMode::RequiresLegacyWorkflow,
        RoiState::Active => EditMode::ReadOnly,
    }
}

/// ROI lifecycle service
pub struct RoiLifecycle {
    db: SqlitePool,
}

impl RoiLifecycle {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_roi(&self, id: i64) -> Result<Roi> {
        store::get_roi(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ROI {}", id)))
    }

    /// ROIs of an instrument; legacy and archived rows only with `include_history`
    pub async fn list_rois(&self, instrument_id: i64, include_history: bool) -> Result<Vec<Roi>> {
        instrument_with_station(&self.db, instrument_id).await?;
        store::list_rois_for_instrument(&self.db, instrument_id, include_history).await
    }

    fn require_editor(caller: &Caller, action: &str) -> Result<()> {
        if caller.is_roi_editor() {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "role '{}' cannot {} ROIs; only ROI editors may change geometry directly",
                caller.role, action
            )))
        }
    }

    fn require_active(roi: &Roi, action: &str) -> Result<()> {
        match roi.state() {
            RoiState::Active => Ok(()),
            state => Err(Error::ConflictState(format!(
                "cannot {} {} {}: ROI is {:?}",
                action, roi.roi_name, roi.id, state
            ))),
        }
    }

    /// Create an Active ROI with the next never-issued `ROI_NN` name
    pub async fn create_roi(
        &self,
        caller: &Caller,
        instrument_id: i64,
        request: CreateRoiRequest,
    ) -> Result<Roi> {
        let (instrument, _) = instrument_with_station(&self.db, instrument_id).await?;
        Self::require_editor(caller, "create")?;
        request.validate()?;

        let pool = &self.db;
        create_with_unique_name(
            EntityKind::Roi,
            None,
            || async {
                let issued = store::roi_names_for_instrument(pool, instrument.id).await?;
                Ok(roi_name(next_sequence(&issued, ROI_PREFIX)))
            },
            |name| async move { store::roi_name_exists(pool, instrument.id, &name).await },
            |name| async move {
                store::insert_roi(pool, &request.into_new_roi(instrument.id, name)).await
            },
        )
        .await
    }

    async fn apply_update(
        &self,
        caller: &Caller,
        id: i64,
        update: RoiUpdate,
        break_timeseries: bool,
    ) -> Result<Roi> {
        let roi = self.get_roi(id).await?;
        Self::require_editor(caller, "edit")?;
        Self::require_active(&roi, "edit")?;

        if let Some(points) = &update.points {
            validate_geometry(points).map_err(Error::Validation)?;
        }
        validate_style(
            update.alpha.unwrap_or(roi.alpha),
            update.thickness.unwrap_or(roi.thickness),
        )
        .map_err(Error::Validation)?;

        let changed = store::update_active_roi(&self.db, id, &update, break_timeseries).await?;
        if changed == 0 {
            return Err(Error::ConflictState(format!(
                "ROI {} changed state before the update was applied",
                id
            )));
        }

        self.get_roi(id).await
    }

    /// Normal in-place update; leaves `timeseries_broken` as it was
    pub async fn update_roi(&self, caller: &Caller, id: i64, update: RoiUpdate) -> Result<Roi> {
        let roi = self.apply_update(caller, id, update, false).await?;
        debug!(roi = %roi.roi_name, roi_id = roi.id, "Updated ROI in place");
        Ok(roi)
    }

    /// In-place update that marks the time series as broken
    pub async fn admin_override_update(
        &self,
        caller: &Caller,
        id: i64,
        update: RoiUpdate,
    ) -> Result<Roi> {
        let roi = self.apply_update(caller, id, update, true).await?;
        warn!(
            roi = %roi.roi_name,
            roi_id = roi.id,
            instrument_id = roi.instrument_id,
            user = %caller.username,
            "Admin override applied; time series marked broken"
        );
        Ok(roi)
    }

    /// Supersede an Active ROI.
    ///
    /// **Algorithm:**
    /// 1. Authorize: ROI editors, or callers with write access to the owning station
    /// 2. Require an Active ROI and a non-empty reason; validate the replacement
    /// 3. In one transaction: flip the ROI to Legacy guarded on its state,
    ///    allocate the next name over all history, insert the replacement,
    ///    then link it from the legacy record
    /// 4. Commit; any failure leaves both records untouched
    ///
    /// Geometry of the superseded ROI is never modified.
    pub async fn mark_as_legacy(
        &self,
        caller: &Caller,
        id: i64,
        request: MarkLegacyRequest,
    ) -> Result<LegacyTransition> {
        let roi = self.get_roi(id).await?;
        let (_, station) = instrument_with_station(&self.db, roi.instrument_id).await?;
        Self::require_supersede(caller, &station)?;
        Self::require_active(&roi, "mark as legacy")?;

        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(Error::Validation("legacy reason must not be empty".into()));
        }
        if let Some(replacement) = &request.replacement {
            replacement.validate()?;
        }

        // The guarded flip is the first statement so the transaction holds the
        // write lock before the name history is read.
        let mut tx = self.db.begin().await?;

        let changed = store::mark_legacy(&mut *tx, roi.id, &reason, Utc::now()).await?;
        if changed == 0 {
            return Err(Error::ConflictState(format!(
                "ROI {} is no longer active",
                roi.roi_name
            )));
        }

        let replacement = match request.replacement {
            Some(replacement) => {
                let issued = store::roi_names_for_instrument(&mut *tx, roi.instrument_id).await?;
                let name = roi_name(next_sequence(&issued, ROI_PREFIX));
                let new_roi = replacement.into_new_roi(roi.instrument_id, name.clone());
                let created = match store::insert_roi(&mut *tx, &new_roi).await {
                    Ok(created) => created,
                    Err(err) if is_unique_violation(&err) => {
                        warn!(roi = %name, instrument_id = roi.instrument_id, "Replacement ROI name taken");
                        return Err(Error::ConcurrentCreationConflict {
                            entity: EntityKind::Roi,
                            name,
                        });
                    }
                    Err(err) => return Err(err),
                };
                if store::link_replacement(&mut *tx, roi.id, created.id).await? == 0 {
                    return Err(Error::ConflictState(format!(
                        "ROI {} already has a replacement",
                        roi.roi_name
                    )));
                }
                Some(created)
            }
            None => None,
        };

        tx.commit().await?;

        info!(
            roi = %roi.roi_name,
            roi_id = roi.id,
            replacement = replacement.as_ref().map(|r| r.roi_name.as_str()).unwrap_or("none"),
            reason = %reason,
            "ROI marked as legacy"
        );

        Ok(LegacyTransition {
            legacy: self.get_roi(roi.id).await?,
            replacement,
        })
    }

    fn require_supersede(caller: &Caller, station: &Station) -> Result<()> {
        if caller.is_roi_editor() || caller.can_write_station(&station.acronym) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "caller '{}' cannot supersede ROIs of station {}",
                caller.username, station.acronym
            )))
        }
    }

    /// Soft-delete: Active becomes Archived and the name stays reserved
    pub async fn delete_roi(&self, caller: &Caller, id: i64) -> Result<Roi> {
        let roi = self.get_roi(id).await?;
        Self::require_editor(caller, "delete")?;
        Self::require_active(&roi, "delete")?;

        if store::archive_roi(&self.db, id).await? == 0 {
            return Err(Error::ConflictState(format!(
                "ROI {} changed state before it could be archived",
                id
            )));
        }

        info!(roi = %roi.roi_name, roi_id = id, "Archived ROI");
        self.get_roi(id).await
    }

    /// Edit mode of a ROI for the calling user
    pub async fn get_edit_mode(&self, caller: &Caller, id: i64) -> Result<EditModeView> {
        let roi = self.get_roi(id).await?;
        let (_, station) = instrument_with_station(&self.db, roi.instrument_id).await?;
        let state = roi.state();

        Ok(EditModeView {
            roi_id: roi.id,
            state,
            edit_mode: edit_mode(
                state,
                caller.is_roi_editor(),
                caller.can_write_station(&station.acronym),
            ),
        })
    }

    /// Current record, legacy predecessors (most recent first), and direct replacement.
    ///
    /// Predecessors are found by walking `replaced_by_roi_id` backwards one
    /// indexed lookup at a time. The link is write-once, so the walk ends.
    pub async fn replacement_chain(&self, id: i64) -> Result<ReplacementChain> {
        let current = self.get_roi(id).await?;

        let mut predecessors = Vec::new();
        let mut seen = HashSet::from([current.id]);
        let mut frontier = vec![current.id];
        while let Some(cursor) = frontier.pop() {
            for roi in store::find_replaced_by(&self.db, cursor).await? {
                if seen.insert(roi.id) {
                    frontier.push(roi.id);
                    predecessors.push(roi);
                }
            }
        }
        predecessors.sort_by(|a, b| b.legacy_date.cmp(&a.legacy_date).then(b.id.cmp(&a.id)));

        let replacement = match current.replaced_by_roi_id {
            Some(next) => store::get_roi(&self.db, next).await?,
            None => None,
        };

        Ok(ReplacementChain {
            current,
            predecessors,
            replacement,
        })
    }
}
