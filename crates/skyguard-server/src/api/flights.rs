//! Flight plan, authorization, and flight log handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use skyguard_core::artifact::{self, ConsumeOutcome};
use skyguard_core::chain::{self, ChainReport, ChainTail};
use skyguard_core::error::ArtifactError;
use skyguard_core::gate::{self, GateContext, GateDecision};
use skyguard_core::models::{
    ArtifactStatus, ComplianceViolation, Drone, FlightLogEntry, FlightLogSummary, FlightPlan,
    FlightStatus, PermissionArtifact, Pilot, ZoneCategory,
};
use skyguard_core::spatial::validate_ring;
use skyguard_core::violations::{self, ScanInput};

use crate::api::error::ApiError;
use crate::persistence::{artifacts, flight_logs, flight_plans, registry, summaries, violations as violation_store};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub drone_id: Uuid,
    pub pilot_id: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    pub polygon: Vec<[f64; 2]>,
    #[serde(default)]
    pub min_altitude_ft: i32,
    pub max_altitude_ft: i32,
    pub planned_start: chrono::DateTime<Utc>,
    pub planned_end: chrono::DateTime<Utc>,
}

pub async fn create_flight_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<FlightPlan>), ApiError> {
    validate_ring(&req.polygon)?;
    if req.planned_end <= req.planned_start {
        return Err(ApiError::Validation(
            "planned_end must be after planned_start".to_string(),
        ));
    }
    if req.max_altitude_ft < req.min_altitude_ft {
        return Err(ApiError::Validation(
            "max_altitude_ft must be at least min_altitude_ft".to_string(),
        ));
    }

    let plan = FlightPlan {
        id: Uuid::new_v4(),
        drone_id: req.drone_id,
        pilot_id: req.pilot_id,
        organization_id: req.organization_id,
        polygon: req.polygon,
        min_altitude_ft: req.min_altitude_ft,
        max_altitude_ft: req.max_altitude_ft,
        planned_start: req.planned_start,
        planned_end: req.planned_end,
        actual_start: None,
        actual_end: None,
        zone_status: None,
        status: FlightStatus::Submitted,
        created_at: Utc::now(),
    };
    flight_plans::upsert_flight_plan(state.db().pool(), &plan).await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn get_flight_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightPlan>, ApiError> {
    let plan = flight_plans::load_flight_plan(state.db().pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("flight plan {id} not found")))?;
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct ValidateNpntRequest {
    pub drone_id: Uuid,
    pub pilot_id: Uuid,
    pub flight_plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ValidateNpntResponse {
    pub passed: bool,
    pub failures: Vec<skyguard_core::gate::CheckFailure>,
}

struct GateRun {
    decision: GateDecision,
    zone: ZoneCategory,
    drone: Drone,
    pilot: Pilot,
}

/// Fetch current registry state for a plan and evaluate the nine-point
/// gate over it. Read-only; callers decide what to do with the outcome.
async fn run_gate(
    state: &AppState,
    plan: &FlightPlan,
    now: chrono::DateTime<Utc>,
) -> Result<GateRun, ApiError> {
    let pool = state.db().pool();
    let drone = registry::load_drone(pool, plan.drone_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("drone {} not found", plan.drone_id)))?;
    let pilot = registry::load_pilot(pool, plan.pilot_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("pilot {} not found", plan.pilot_id)))?;
    let tc = registry::load_type_certificate(pool, drone.type_certificate_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "type certificate {} not found",
                drone.type_certificate_id
            ))
        })?;
    let open_maintenance = registry::load_open_maintenance(pool, drone.id).await?;

    let zone_decision = state
        .zones()
        .read()
        .await
        .classify_polygon(&plan.polygon, plan.min_altitude_ft, plan.max_altitude_ft)?;

    let decision = gate::evaluate(&GateContext {
        drone: &drone,
        pilot: &pilot,
        type_certificate: &tc,
        flight_plan: plan,
        open_maintenance: &open_maintenance,
        zone: &zone_decision,
        min_altitude_ft: state.config().min_altitude_ft,
        now,
    });

    Ok(GateRun {
        decision,
        zone: zone_decision.zone,
        drone,
        pilot,
    })
}

/// Run the eligibility gate for a flight plan without issuing anything.
/// The plan is left untouched so the check can be repeated freely.
pub async fn validate_npnt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateNpntRequest>,
) -> Result<Json<ValidateNpntResponse>, ApiError> {
    let pool = state.db().pool();
    let plan = flight_plans::load_flight_plan(pool, req.flight_plan_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("flight plan {} not found", req.flight_plan_id))
        })?;
    if plan.drone_id != req.drone_id || plan.pilot_id != req.pilot_id {
        return Err(ApiError::Validation(
            "drone_id and pilot_id must match the flight plan".to_string(),
        ));
    }

    let run = run_gate(&state, &plan, Utc::now()).await?;
    tracing::info!(
        flight_plan_id = %plan.id,
        passed = run.decision.passed,
        failures = run.decision.failures.len(),
        "NPNT validation evaluated"
    );
    Ok(Json(ValidateNpntResponse {
        passed: run.decision.passed,
        failures: run.decision.failures,
    }))
}

/// Takeoff. Re-runs the gate against current registry state, issues the
/// permission artifact if the plan has none yet, consumes it, and moves
/// the plan to InProgress.
pub async fn start_flight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightPlan>, ApiError> {
    let pool = state.db().pool();
    let mut plan = flight_plans::load_flight_plan(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("flight plan {id} not found")))?;

    if !matches!(plan.status, FlightStatus::Submitted | FlightStatus::Approved) {
        return Err(ApiError::Conflict(format!(
            "flight plan is {:?}, must be Submitted or Approved to start",
            plan.status
        )));
    }

    let now = Utc::now();
    let run = run_gate(&state, &plan, now).await?;
    if !run.decision.passed {
        tracing::info!(
            flight_plan_id = %plan.id,
            failures = run.decision.failures.len(),
            "takeoff blocked by gate"
        );
        return Err(ApiError::GateFailed(run.decision.failures));
    }

    let art = match artifacts::load_artifact_by_plan(pool, plan.id).await? {
        Some(existing) => existing,
        None => {
            let issued = state
                .signer()
                .issue(&run.decision, &plan, &run.drone, &run.pilot, now)?;
            match artifacts::insert_artifact(pool, &issued).await {
                Ok(()) => {
                    tracing::info!(
                        flight_plan_id = %plan.id,
                        artifact_id = %issued.id,
                        "permission artifact issued"
                    );
                    issued
                }
                // A concurrent start won the insert; fall back to its row.
                Err(artifacts::InsertArtifactError::Duplicate) => {
                    artifacts::load_artifact_by_plan(pool, plan.id)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("artifact missing after duplicate insert"))?
                }
                Err(artifacts::InsertArtifactError::Other(e)) => return Err(e.into()),
            }
        }
    };

    match artifact::consume(&art, now) {
        Ok(ConsumeOutcome::Consumed) => {
            // The guarded update is the real single-use gate; a racing
            // start that also saw the artifact as Valid loses here.
            if !artifacts::consume_artifact(pool, art.id, now).await? {
                return Err(ArtifactError::AlreadyUsed.into());
            }
        }
        Ok(ConsumeOutcome::AutoExpired) => {
            artifacts::update_artifact_status(
                pool,
                art.id,
                ArtifactStatus::Expired,
                None,
                None,
                None,
            )
            .await?;
            return Err(ApiError::Gone(format!(
                "artifact expired at {}",
                art.valid_until
            )));
        }
        Err(e) => return Err(e.into()),
    }

    plan.zone_status = Some(run.zone);
    plan.status = FlightStatus::InProgress;
    plan.actual_start = Some(now);
    flight_plans::upsert_flight_plan(pool, &plan).await?;
    tracing::info!(flight_plan_id = %plan.id, "flight started");

    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct IngestEntry {
    pub timestamp: chrono::DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    #[serde(default)]
    pub altitude_agl_m: Option<f64>,
    #[serde(default)]
    pub ground_speed_mps: Option<f64>,
    #[serde(default)]
    pub battery_percentage: Option<i32>,
    #[serde(default)]
    pub gps_satellites: Option<i32>,
    pub sequence_number: i64,
    pub previous_hash: String,
    pub entry_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub drone_id: Uuid,
    pub flight_id: Uuid,
    pub entries: Vec<IngestEntry>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub entries_accepted: usize,
    pub chain_sequence: i64,
    pub chain_hash: String,
}

/// Append a batch of log entries to a flight's hash chain.
///
/// The batch commits atomically: the first entry that fails validation
/// rejects the whole request and nothing is persisted. A per-flight lock
/// serializes the tail read and the inserts.
pub async fn ingest_logs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if req.entries.is_empty() {
        return Err(ApiError::Validation("entries must not be empty".to_string()));
    }

    let pool = state.db().pool();
    let plan = flight_plans::load_flight_plan(pool, req.flight_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("flight plan {} not found", req.flight_id)))?;
    if plan.drone_id != req.drone_id {
        return Err(ApiError::Validation(
            "drone_id does not match the flight plan".to_string(),
        ));
    }
    if plan.status != FlightStatus::InProgress {
        return Err(ApiError::Conflict(format!(
            "flight plan is {:?}, logs are only accepted while InProgress",
            plan.status
        )));
    }

    let lock = state.append_lock(plan.id);
    let _guard = lock.lock().await;

    let mut tail = flight_logs::chain_tail(pool, plan.id).await?;

    let mut accepted: Vec<FlightLogEntry> = Vec::with_capacity(req.entries.len());
    for (i, raw) in req.entries.iter().enumerate() {
        let entry = FlightLogEntry {
            drone_id: plan.drone_id,
            flight_id: plan.id,
            timestamp: raw.timestamp,
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude_m: raw.altitude_m,
            altitude_agl_m: raw.altitude_agl_m,
            ground_speed_mps: raw.ground_speed_mps,
            battery_percentage: raw.battery_percentage,
            gps_satellites: raw.gps_satellites,
            sequence_number: raw.sequence_number,
            previous_hash: raw.previous_hash.clone(),
            entry_hash: raw.entry_hash.clone(),
        };

        chain::expect_next(tail.as_ref(), &entry)
            .map_err(|e| ApiError::Conflict(format!("entry {i}: {e}")))?;
        if chain::compute_hash(&entry) != entry.entry_hash {
            return Err(ApiError::Validation(format!(
                "entry {i}: entry hash does not match recorded fields"
            )));
        }

        tail = Some(ChainTail {
            sequence: entry.sequence_number,
            hash: entry.entry_hash.clone(),
        });
        accepted.push(entry);
    }

    flight_logs::append_batch(pool, &accepted).await?;

    // tail is Some here because entries is non-empty.
    let tail = tail.ok_or_else(|| anyhow::anyhow!("chain tail missing after append"))?;
    tracing::debug!(
        flight_plan_id = %plan.id,
        entries = accepted.len(),
        sequence = tail.sequence,
        "log entries appended"
    );

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            entries_accepted: accepted.len(),
            chain_sequence: tail.sequence,
            chain_hash: tail.hash,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct CompleteFlightResponse {
    pub plan: FlightPlan,
    pub chain: ChainReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<FlightLogSummary>,
    pub violations: Vec<ComplianceViolation>,
}

/// Close out a flight: verify the chain, write the summary, and run the
/// violation scan over the committed logs.
pub async fn complete_flight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompleteFlightResponse>, ApiError> {
    let pool = state.db().pool();
    let mut plan = flight_plans::load_flight_plan(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("flight plan {id} not found")))?;

    if plan.status != FlightStatus::InProgress {
        return Err(ApiError::Conflict(format!(
            "flight plan is {:?}, must be InProgress to complete",
            plan.status
        )));
    }

    let entries = flight_logs::load_entries(pool, plan.id).await?;
    let report = chain::verify_chain(&entries);

    let drone = registry::load_drone(pool, plan.drone_id).await?;
    let ceiling_ft = match &drone {
        Some(d) => registry::load_type_certificate(pool, d.type_certificate_id)
            .await?
            .map(|tc| tc.operating_altitude_max_ft as f64)
            .unwrap_or(plan.max_altitude_ft as f64),
        None => plan.max_altitude_ft as f64,
    } + state.config().altitude_tolerance_ft;

    let now = Utc::now();
    let art = artifacts::load_artifact_by_plan(pool, plan.id).await?;
    let zones = state.zones().read().await;
    let found = violations::scan(&ScanInput {
        plan: &plan,
        artifact: art.as_ref(),
        entries: &entries,
        chain: &report,
        zones: &zones,
        altitude_ceiling_ft: ceiling_ft,
        now,
    });
    drop(zones);

    for violation in &found {
        violation_store::insert_violation(pool, violation).await?;
        tracing::warn!(
            flight_plan_id = %plan.id,
            violation = ?violation.violation_type,
            severity = ?violation.severity,
            "violation detected"
        );
    }

    let limit_agl_m = ceiling_ft / skyguard_core::violations::METERS_TO_FEET;
    let summary = skyguard_core::summary::summarize(plan.id, plan.drone_id, &entries, &report, limit_agl_m);
    if let Some(ref s) = summary {
        summaries::insert_summary(pool, s).await?;
    }

    plan.status = FlightStatus::Completed;
    plan.actual_end = Some(now);
    flight_plans::upsert_flight_plan(pool, &plan).await?;
    tracing::info!(
        flight_plan_id = %plan.id,
        chain_intact = report.intact,
        violations = found.len(),
        "flight completed"
    );

    Ok(Json(CompleteFlightResponse {
        plan,
        chain: report,
        summary,
        violations: found,
    }))
}

pub async fn get_flight_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FlightLogEntry>>, ApiError> {
    let entries = flight_logs::load_entries(state.db().pool(), id).await?;
    Ok(Json(entries))
}

pub async fn verify_flight_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChainReport>, ApiError> {
    let entries = flight_logs::load_entries(state.db().pool(), id).await?;
    Ok(Json(chain::verify_chain(&entries)))
}

pub async fn get_flight_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightLogSummary>, ApiError> {
    let summary = summaries::load_summary(state.db().pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no summary for flight plan {id}")))?;
    Ok(Json(summary))
}

pub async fn get_flight_violations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ComplianceViolation>>, ApiError> {
    let found = violation_store::load_violations_for_plan(state.db().pool(), id).await?;
    Ok(Json(found))
}

pub async fn get_plan_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PermissionArtifact>, ApiError> {
    let art = artifacts::load_artifact_by_plan(state.db().pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no artifact for flight plan {id}")))?;
    Ok(Json(art))
}

pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PermissionArtifact>, ApiError> {
    let art = artifacts::load_artifact(state.db().pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("artifact {id} not found")))?;
    Ok(Json(art))
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub reason: String,
}

/// Revoke an artifact. Idempotent; revoking twice leaves the original
/// revocation record in place.
pub async fn revoke_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<PermissionArtifact>, ApiError> {
    let pool = state.db().pool();
    let art = artifacts::load_artifact(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("artifact {id} not found")))?;

    if artifact::can_revoke(&art) {
        artifacts::update_artifact_status(
            pool,
            art.id,
            ArtifactStatus::Revoked,
            None,
            Some(Utc::now()),
            Some(&req.reason),
        )
        .await?;
        tracing::info!(artifact_id = %art.id, "artifact revoked");
    }

    let updated = artifacts::load_artifact(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("artifact {id} not found")))?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct VerifyArtifactRequest {
    pub payload_json: String,
    pub signature: String,
}

/// Verify a presented artifact the way a field inspector with the public
/// key would: signature over the canonical payload, validity window from
/// the signed payload, and lifecycle status. When the artifact is known
/// to this issuer its stored status is used, so a revocation shows up
/// even though the presented bytes still carry a good signature.
pub async fn verify_artifact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyArtifactRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = state.signer().verifying_key();
    let mut probe = PermissionArtifact {
        id: Uuid::nil(),
        flight_plan_id: Uuid::nil(),
        payload_json: req.payload_json,
        signature: req.signature,
        issued_at: Utc::now(),
        valid_from: Utc::now(),
        valid_until: Utc::now(),
        status: ArtifactStatus::Valid,
        used_at: None,
        revoked_at: None,
        revocation_reason: None,
    };

    let payload = match artifact::verify_signature(&probe, &key) {
        Ok(payload) => payload,
        Err(e) => return Ok(Json(json!({ "valid": false, "reason": e.to_string() }))),
    };
    if let Some(stored) = artifacts::load_artifact(state.db().pool(), payload.artifact_id).await? {
        probe.status = stored.status;
    }

    match artifact::verify(&probe, &key, Utc::now()) {
        Ok(payload) => Ok(Json(json!({ "valid": true, "payload": payload }))),
        Err(e) => Ok(Json(json!({ "valid": false, "reason": e.to_string() }))),
    }
}
