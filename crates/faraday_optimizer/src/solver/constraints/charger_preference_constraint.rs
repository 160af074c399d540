use fxhash::FxHashMap;
use jiff::tz::TimeZone;
use tracing::warn;

use crate::{
    maf::{parameter::DecodedValue, parameters::ConstraintConfig},
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

const DISCONNECTED_KEY: &str = "DISC";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ApplyToPosition {
    First,
    All,
    Longest,
}

/// Steers early departures onto vehicles standing on preferred chargers.
///
/// Routes inside the hour window are ranked globally by departure time and
/// vehicles by mapped charger cost, highest first; the r-th departing route
/// earns its vehicle's mapped cost when that vehicle holds rank r.
#[derive(Clone, Debug)]
pub struct ChargerPreferenceConstraint {
    charger_costs: FxHashMap<String, f64>,
    window_start_hour: i8,
    window_end_hour: i8,
    apply_to: ApplyToPosition,
}

impl ChargerPreferenceConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        let charger_costs = match config.param("map") {
            // Legacy JSON object form: {"87": 3, "DISC": -3}.
            Some(DecodedValue::Object(map)) => map
                .iter()
                .filter_map(|(key, value)| {
                    let cost = value
                        .as_f64()
                        .or_else(|| value.as_str().and_then(|text| text.parse().ok()))?;
                    Some((normalize_charger_key(key), cost))
                })
                .collect(),
            // List form: [87,86]:3,[85,83]:0,[DISC]:2.
            Some(DecodedValue::Text(text)) if text.trim_start().starts_with('[') => {
                parse_list_format(text)
            }
            Some(_) => {
                warn!("unrecognized charger preference map shape, using empty map");
                FxHashMap::default()
            }
            None => FxHashMap::default(),
        };

        let apply_to = match config.text_or("apply_to_position", "first") {
            "first" => ApplyToPosition::First,
            "all" => ApplyToPosition::All,
            "longest" => ApplyToPosition::Longest,
            other => {
                warn!(value = other, "invalid apply_to_position, using `first`");
                ApplyToPosition::First
            }
        };

        ChargerPreferenceConstraint {
            charger_costs,
            window_start_hour: config.int_or("time_window_start", 0) as i8,
            window_end_hour: config.int_or("time_window_end", 24) as i8,
            apply_to,
        }
    }

    fn hour_in_window(&self, hour: i8) -> bool {
        if self.window_start_hour <= self.window_end_hour {
            self.window_start_hour <= hour && hour < self.window_end_hour
        } else {
            // Window crosses midnight, e.g. 22:00 to 06:00.
            hour >= self.window_start_hour || hour < self.window_end_hour
        }
    }

    fn charger_cost(&self, ctx: &EvaluationContext, vehicle: &Vehicle) -> f64 {
        let key = match ctx.vehicle_chargers.get(&vehicle.vehicle_id()) {
            Some(Some(charger_id)) => charger_id.to_string(),
            _ => DISCONNECTED_KEY.to_owned(),
        };
        self.charger_costs.get(&key).copied().unwrap_or(0.0)
    }

    fn target_routes<'s>(&self, sequence: &[&'s Route]) -> Vec<&'s Route> {
        match self.apply_to {
            ApplyToPosition::First => sequence.first().map(|route| vec![*route]).unwrap_or_default(),
            ApplyToPosition::All => sequence.to_vec(),
            ApplyToPosition::Longest => {
                let mut longest: Option<&Route> = None;
                for route in sequence {
                    match longest {
                        Some(current) if route.duration() <= current.duration() => {}
                        _ => longest = Some(route),
                    }
                }
                longest.map(|route| vec![route]).unwrap_or_default()
            }
        }
    }
}

impl SequenceConstraint for ChargerPreferenceConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Soft
    }

    fn evaluate(&self, vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score {
        if sequence.is_empty() || self.charger_costs.is_empty() {
            return Score::ZERO;
        }

        let vehicle_cost = self.charger_cost(ctx, vehicle);
        if vehicle_cost == 0.0 {
            return Score::ZERO;
        }

        // Global departure order of the routes inside the hour window.
        let mut routes_in_window: Vec<&Route> = ctx
            .all_routes
            .iter()
            .filter(|route| self.hour_in_window(local_hour(route)))
            .collect();
        if routes_in_window.is_empty() {
            return Score::ZERO;
        }
        routes_in_window.sort_by(|a, b| {
            a.plan_start()
                .cmp(&b.plan_start())
                .then_with(|| a.route_id().cmp(b.route_id()))
        });
        let route_positions: FxHashMap<_, _> = routes_in_window
            .iter()
            .enumerate()
            .map(|(position, route)| (route.route_id().clone(), position))
            .collect();

        // Vehicles ranked by charger cost, highest first, stable for ties.
        let mut vehicle_costs: Vec<(usize, f64)> = ctx
            .all_vehicles
            .iter()
            .enumerate()
            .map(|(index, v)| (index, self.charger_cost(ctx, v)))
            .collect();
        vehicle_costs.sort_by(|a, b| b.1.total_cmp(&a.1));

        let Some(vehicle_rank) = vehicle_costs.iter().position(|(index, _)| {
            ctx.all_vehicles[*index].vehicle_id() == vehicle.vehicle_id()
        }) else {
            return Score::ZERO;
        };

        let mut total = 0.0;
        for route in self.target_routes(sequence) {
            if !self.hour_in_window(local_hour(route)) {
                continue;
            }
            if route_positions.get(route.route_id()) == Some(&vehicle_rank) {
                total += vehicle_cost;
            }
        }

        Score::soft(total)
    }
}

fn local_hour(route: &Route) -> i8 {
    route.plan_start().to_zoned(TimeZone::UTC).hour()
}

fn normalize_charger_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.eq_ignore_ascii_case(DISCONNECTED_KEY) {
        DISCONNECTED_KEY.to_owned()
    } else if let Ok(id) = trimmed.parse::<i64>() {
        id.to_string()
    } else {
        trimmed.to_owned()
    }
}

fn parse_list_format(raw: &str) -> FxHashMap<String, f64> {
    let mut map = FxHashMap::default();
    let mut rest = raw;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|offset| open + offset) else {
            break;
        };
        let keys = &rest[open + 1..close];
        let after = &rest[close + 1..];
        let Some(colon) = after.find(':') else {
            break;
        };

        let value_text: String = after[colon + 1..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
            .collect();

        if let Ok(value) = value_text.parse::<f64>() {
            for part in keys.split(',') {
                let part = part.trim();
                if !part.is_empty() {
                    map.insert(normalize_charger_key(part), value);
                }
            }
        }

        rest = &after[colon + 1..];
    }

    if map.is_empty() {
        warn!(raw, "charger preference map parsed empty");
    }

    map
}
