use crate::geo::corridor::{detour_km, routes_similar, DEFAULT_CORRIDOR_KM};
use crate::models::matching::RankedMatch;
use crate::models::request::ParcelRequest;
use crate::models::traveler::Traveler;

pub const MAX_REQUESTS: usize = 100;
pub const MAX_TRAVELERS_PER_REQUEST: usize = 100;
pub const SATURATION_CANDIDATES: usize = 10;
pub const MATCHES_PER_REQUEST: usize = 3;
pub const MAX_TOTAL_MATCHES: usize = 50;
pub const MAX_DETOUR_KM: f64 = 10.0;

/// Bounded greedy pairing of requests with traveler routes.
///
/// Each request scans travelers in input order and stops once
/// [`SATURATION_CANDIDATES`] pass the corridor and detour filters, so the
/// result is the best of the first admitted candidates, not a global top-k.
/// Ties keep input order. Pure function of its inputs.
pub fn rank(requests: &[ParcelRequest], travelers: &[Traveler]) -> Vec<RankedMatch> {
    let mut matches = Vec::new();

    for request in requests.iter().take(MAX_REQUESTS) {
        if !request.pickup.is_finite() || !request.drop.is_finite() {
            continue;
        }

        let mut candidates: Vec<RankedMatch> = Vec::new();

        for traveler in travelers.iter().take(MAX_TRAVELERS_PER_REQUEST) {
            if !routes_similar(
                &request.pickup,
                &request.drop,
                &traveler.origin,
                &traveler.destination,
                DEFAULT_CORRIDOR_KM,
            ) {
                continue;
            }

            let detour = detour_km(
                &request.pickup,
                &request.drop,
                &traveler.origin,
                &traveler.destination,
            );
            if !(0.0..=MAX_DETOUR_KM).contains(&detour) {
                continue;
            }

            candidates.push(RankedMatch {
                request_id: request.id,
                traveler_id: traveler.id,
                detour_km: detour,
            });

            if candidates.len() >= SATURATION_CANDIDATES {
                break;
            }
        }

        candidates.sort_by(|a, b| a.detour_km.total_cmp(&b.detour_km));

        let room = MAX_TOTAL_MATCHES - matches.len();
        matches.extend(candidates.into_iter().take(MATCHES_PER_REQUEST.min(room)));

        if matches.len() >= MAX_TOTAL_MATCHES {
            break;
        }
    }

    matches
}
