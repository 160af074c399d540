use jiff::{SignedDuration, Timestamp};
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    maf::site_config::SiteConfig,
    problem::{
        route::Route,
        vehicle::{Vehicle, VehicleId},
        window::VehicleAvailability,
    },
    solver::{
        constraints::{engine::ConstraintEngine, evaluation_context::EvaluationContext},
        score::Score,
    },
};

/// One feasible ordered route sequence for one vehicle, scored by the
/// constraint engine. Route indices point into the eligible route slice.
#[derive(Debug, Clone)]
pub struct SequenceCandidate {
    pub vehicle_id: VehicleId,
    pub route_indices: SmallVec<[usize; 4]>,
    pub score: Score,
}

impl SequenceCandidate {
    pub fn len(&self) -> usize {
        self.route_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route_indices.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnumerationLimits {
    pub max_routes_per_vehicle: usize,
    pub turnaround: SignedDuration,
}

/// The enforced gap between sequential routes: the strict turnaround minimum
/// (when that constraint is enabled) or the site sequencing buffer, whichever
/// is larger.
pub fn effective_turnaround(engine: &ConstraintEngine, config: &SiteConfig) -> SignedDuration {
    let strict = engine.strict_turnaround().unwrap_or(SignedDuration::ZERO);
    let buffer = SignedDuration::from_mins(config.route_sequence_buffer_minutes);
    strict.max(buffer)
}

/// Enumerate every feasible route sequence up to the configured length cap.
///
/// Routes must be sorted by start time. Extension is depth-first; a prefix
/// that fails a hard constraint is never extended, which is sound because
/// every hard constraint here is monotone under extension. Uncovered routes
/// are modeled by absence, so no empty sequence is ever emitted.
pub fn enumerate_sequences(
    vehicles: &[Vehicle],
    routes: &[Route],
    engine: &ConstraintEngine,
    ctx: &EvaluationContext,
    limits: &EnumerationLimits,
) -> Vec<SequenceCandidate> {
    let mut candidates = Vec::new();

    for vehicle in vehicles {
        let available_from = ctx
            .availability
            .get(&vehicle.vehicle_id())
            .map(|availability: &VehicleAvailability| availability.available_from)
            .unwrap_or(ctx.now);

        let before = candidates.len();
        let mut prefix = SmallVec::new();
        extend_from(
            vehicle,
            routes,
            available_from,
            engine,
            ctx,
            limits,
            &mut prefix,
            0,
            &mut candidates,
        );

        debug!(
            vehicle_id = %vehicle.vehicle_id(),
            sequences = candidates.len() - before,
            "feasible sequences enumerated"
        );
    }

    candidates
}

#[allow(clippy::too_many_arguments)]
fn extend_from(
    vehicle: &Vehicle,
    routes: &[Route],
    available_from: Timestamp,
    engine: &ConstraintEngine,
    ctx: &EvaluationContext,
    limits: &EnumerationLimits,
    prefix: &mut SmallVec<[usize; 4]>,
    start_index: usize,
    out: &mut Vec<SequenceCandidate>,
) {
    for index in start_index..routes.len() {
        let route = &routes[index];

        let admissible = match prefix.last() {
            None => route.plan_start() >= available_from,
            Some(&last) => routes[last].can_precede(route, limits.turnaround),
        };
        if !admissible {
            continue;
        }

        prefix.push(index);
        let sequence: Vec<&Route> = prefix.iter().map(|&i| &routes[i]).collect();
        let evaluation = engine.evaluate(vehicle, &sequence, ctx);

        if evaluation.feasible {
            out.push(SequenceCandidate {
                vehicle_id: vehicle.vehicle_id(),
                route_indices: prefix.clone(),
                score: evaluation.score,
            });

            if prefix.len() < limits.max_routes_per_vehicle {
                extend_from(
                    vehicle,
                    routes,
                    available_from,
                    engine,
                    ctx,
                    limits,
                    prefix,
                    index + 1,
                    out,
                );
            }
        }

        prefix.pop();
    }
}
