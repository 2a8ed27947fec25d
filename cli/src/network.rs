use anyhow::Result;
use serde::Deserialize;

use itinerary::Location;
use schedutil::{prettyprint_usize, Timer};
use tripgen::{EdgeID, EdgeSets, LonLat, RoadNetwork, TripError};

/// A road network loaded from a flat CSV of edges, one row per edge with its representative
/// point. Good enough for proximity queries; anything smarter should implement RoadNetwork
/// against the real engine.
pub struct CsvNetwork {
    edges: Vec<Edge>,
}

struct Edge {
    id: EdgeID,
    center: LonLat,
    pedestrian: bool,
    vehicle: bool,
}

#[derive(Deserialize)]
struct EdgeRecord {
    edge: String,
    lon: f64,
    lat: f64,
    pedestrian: bool,
    vehicle: bool,
}

impl CsvNetwork {
    pub fn load(path: &str, timer: &mut Timer) -> Result<CsvNetwork> {
        timer.start(format!("read road network from {}", path));
        let mut edges = Vec::new();
        for rec in csv::Reader::from_reader(fs_err::File::open(path)?).deserialize() {
            let rec: EdgeRecord = rec?;
            edges.push(Edge {
                id: EdgeID(rec.edge),
                center: LonLat::new(rec.lon, rec.lat),
                pedestrian: rec.pedestrian,
                vehicle: rec.vehicle,
            });
        }
        timer.note(format!("{} edges", prettyprint_usize(edges.len())));
        timer.stop(format!("read road network from {}", path));
        Ok(CsvNetwork { edges })
    }

    #[cfg(test)]
    fn from_edges(edges: Vec<Edge>) -> CsvNetwork {
        CsvNetwork { edges }
    }
}

impl RoadNetwork for CsvNetwork {
    fn nearby_edges(
        &self,
        center: LonLat,
        radius: f64,
        max_neighbors: usize,
    ) -> Result<EdgeSets, TripError> {
        // Linear scan. The edge cache only queries each location once, so this has never shown up
        // in profiles.
        let mut hits: Vec<(f64, &Edge)> = self
            .edges
            .iter()
            .filter_map(|e| {
                let dist = center.gps_dist_meters(e.center);
                if dist <= radius {
                    Some((dist, e))
                } else {
                    None
                }
            })
            .collect();
        hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let mut sets = EdgeSets::default();
        for (_, e) in hits {
            if e.pedestrian && sets.pedestrian.len() < max_neighbors {
                sets.pedestrian.push(e.id.clone());
            }
            if e.vehicle && sets.vehicle.len() < max_neighbors {
                sets.vehicle.push(e.id.clone());
            }
        }
        if sets.pedestrian.is_empty() && sets.vehicle.is_empty() {
            return Err(TripError::NoEdgesFound {
                location: Location(format!("({}, {})", center.longitude, center.latitude)),
                radius,
            });
        }
        Ok(sets)
    }
}
