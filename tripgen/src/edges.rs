use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use itinerary::Location;
use schedutil::{prettyprint_usize, Timer};

use crate::{TripError, TripMode};

/// Identifies one road-network edge in the external network's namespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeID(pub String);

impl fmt::Display for EdgeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// longitude is x, latitude is y
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat {
            longitude: lon,
            latitude: lat,
        }
    }

    pub fn gps_dist_meters(self, other: LonLat) -> f64 {
        // Haversine distance
        let earth_radius_m = 6_371_000.0;
        let lon1 = self.longitude.to_radians();
        let lon2 = other.longitude.to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let delta_lat = lat2 - lat1;
        let delta_lon = lon2 - lon1;

        let a = (delta_lat / 2.0).sin().powi(2)
            + (delta_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        earth_radius_m * c
    }

    pub fn center(pts: &[LonLat]) -> LonLat {
        let mut lon = 0.0;
        let mut lat = 0.0;
        for pt in pts {
            lon += pt.longitude;
            lat += pt.latitude;
        }
        let len = pts.len() as f64;
        LonLat {
            longitude: lon / len,
            latitude: lat / len,
        }
    }
}

/// Where a symbolic location sits in the world, from the location table.
#[derive(Clone, Debug)]
pub enum LocationGeometry {
    Point(LonLat),
    Polygon(Vec<LonLat>),
}

impl LocationGeometry {
    pub fn center(&self) -> LonLat {
        match self {
            LocationGeometry::Point(pt) => *pt,
            LocationGeometry::Polygon(pts) => LonLat::center(pts),
        }
    }
}

/// The edges near one location, split by mode compatibility, closest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeSets {
    pub pedestrian: Vec<EdgeID>,
    pub vehicle: Vec<EdgeID>,
}

impl EdgeSets {
    /// Bikes resolve against the vehicle edges until the network data distinguishes bike lanes.
    pub fn compatible_with(&self, mode: TripMode) -> &Vec<EdgeID> {
        match mode {
            TripMode::Walk => &self.pedestrian,
            TripMode::Bike | TripMode::Car => &self.vehicle,
        }
    }

    fn union(&mut self, other: EdgeSets) {
        for e in other.pedestrian {
            if !self.pedestrian.contains(&e) {
                self.pedestrian.push(e);
            }
        }
        for e in other.vehicle {
            if !self.vehicle.contains(&e) {
                self.vehicle.push(e);
            }
        }
    }
}

/// The boundary to the external road-network engine. Implementations answer proximity queries;
/// everything else about the network stays on their side.
pub trait RoadNetwork {
    /// All edges within `radius` distance units of `center`, sorted ascending by distance and
    /// capped at `max_neighbors` per mode list. An empty result is NoEdgesFound, not a success.
    fn nearby_edges(
        &self,
        center: LonLat,
        radius: f64,
        max_neighbors: usize,
    ) -> Result<EdgeSets, TripError>;
}

/// Memoizes one RoadNetwork lookup per distinct location. TripDeriver only ever reads the cached
/// sets, so the expensive neighbor searches happen exactly once each, up front.
pub struct EdgeCache {
    max_neighbors: usize,
    radius: f64,
    cache: BTreeMap<Location, EdgeSets>,
}

impl EdgeCache {
    pub fn new(radius: f64, max_neighbors: usize) -> EdgeCache {
        EdgeCache {
            max_neighbors,
            radius,
            cache: BTreeMap::new(),
        }
    }

    /// Resolves every location in the table, recording per-location failures instead of aborting.
    /// Locations that fail stay out of the cache; trips touching them fail later, one person at a
    /// time.
    pub fn warm(
        &mut self,
        net: &dyn RoadNetwork,
        locations: &LocationTable,
        timer: &mut Timer,
    ) -> Vec<(Location, TripError)> {
        let mut failures = Vec::new();
        timer.start_iter("resolve locations to edges", locations.map.len());
        for (location, geometry) in &locations.map {
            timer.next();
            match self.resolve(net, location, geometry) {
                Ok(_) => {}
                Err(err) => {
                    warn!("couldn't resolve {}: {}", location, err);
                    failures.push((location.clone(), err));
                }
            }
        }
        timer.note(format!(
            "resolved {} locations, {} unresolvable",
            prettyprint_usize(self.cache.len()),
            prettyprint_usize(failures.len())
        ));
        failures
    }

    fn resolve(
        &mut self,
        net: &dyn RoadNetwork,
        location: &Location,
        geometry: &LocationGeometry,
    ) -> Result<(), TripError> {
        let sets = match geometry {
            LocationGeometry::Point(pt) => net
                .nearby_edges(*pt, self.radius, self.max_neighbors)
                .map_err(|err| match err {
                    // The network only sees coordinates; name the location here.
                    TripError::NoEdgesFound { radius, .. } => TripError::NoEdgesFound {
                        location: location.clone(),
                        radius,
                    },
                    other => other,
                }),
            LocationGeometry::Polygon(pts) => {
                if pts.is_empty() {
                    return Err(TripError::EmptyPolygon(location.clone()));
                }
                // Union the per-vertex queries. Any vertex finding edges is enough.
                let mut union = EdgeSets::default();
                let mut found_any = false;
                for pt in pts {
                    match net.nearby_edges(*pt, self.radius, self.max_neighbors) {
                        Ok(sets) => {
                            union.union(sets);
                            found_any = true;
                        }
                        Err(TripError::NoEdgesFound { .. }) => {}
                        Err(err) => {
                            return Err(err);
                        }
                    }
                }
                if found_any {
                    Ok(union)
                } else {
                    Err(TripError::NoEdgesFound {
                        location: location.clone(),
                        radius: self.radius,
                    })
                }
            }
        }?;
        self.cache.insert(location.clone(), sets);
        Ok(())
    }

    pub fn get(&self, location: &Location) -> Option<&EdgeSets> {
        self.cache.get(location)
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, location: Location, sets: EdgeSets) {
        self.cache.insert(location, sets);
    }
}

/// The location -> geometry table from input. One row per location: {location, vertices}, where
/// vertices is one or more semicolon-separated "lon lat" pairs; a single pair is a point,
/// several are a polygon.
pub struct LocationTable {
    map: BTreeMap<Location, LocationGeometry>,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    location: String,
    vertices: String,
}

impl LocationTable {
    pub fn load(path: &str) -> Result<LocationTable> {
        let mut map = BTreeMap::new();
        for rec in csv::Reader::from_reader(fs_err::File::open(path)?).deserialize() {
            let rec: LocationRow = rec.context("unreadable location row")?;
            let geometry = parse_vertices(&rec.vertices)
                .with_context(|| format!("location {} has bad vertices", rec.location))?;
            if map.insert(Location(rec.location.clone()), geometry).is_some() {
                bail!("location {} appears twice in {}", rec.location, path);
            }
        }
        Ok(LocationTable { map })
    }

    pub fn get(&self, location: &Location) -> Option<&LocationGeometry> {
        self.map.get(location)
    }

    pub fn centers(&self) -> BTreeMap<Location, LonLat> {
        self.map
            .iter()
            .map(|(loc, geometry)| (loc.clone(), geometry.center()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn parse_vertices(raw: &str) -> Result<LocationGeometry> {
    let mut pts = Vec::new();
    for pair in raw.split(';').filter(|p| !p.trim().is_empty()) {
        let parts: Vec<&str> = pair.split_whitespace().collect();
        if parts.len() != 2 {
            bail!("expected \"lon lat\", got {:?}", pair);
        }
        pts.push(LonLat::new(parts[0].parse()?, parts[1].parse()?));
    }
    match pts.len() {
        0 => bail!("no vertices at all"),
        1 => Ok(LocationGeometry::Point(pts[0])),
        _ => Ok(LocationGeometry::Polygon(pts)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands back a fixed edge per mode for points near the origin, nothing elsewhere.
    struct FakeNetwork;

    impl RoadNetwork for FakeNetwork {
        fn nearby_edges(
            &self,
            center: LonLat,
            radius: f64,
            _max_neighbors: usize,
        ) -> Result<EdgeSets, TripError> {
            if center.gps_dist_meters(LonLat::new(0.0, 0.0)) < 1000.0 {
                Ok(EdgeSets {
                    pedestrian: vec![EdgeID("ped1".to_string())],
                    vehicle: vec![EdgeID("car1".to_string())],
                })
            } else {
                Err(TripError::NoEdgesFound {
                    location: Location("?".to_string()),
                    radius,
                })
            }
        }
    }

    #[test]
    fn zero_edges_is_an_error_not_an_empty_success() {
        let mut cache = EdgeCache::new(100.0, 8);
        let far = Location("far".to_string());
        let err = cache
            .resolve(
                &FakeNetwork,
                &far,
                &LocationGeometry::Point(LonLat::new(10.0, 10.0)),
            )
            .unwrap_err();
        assert!(matches!(err, TripError::NoEdgesFound { .. }));
        assert!(cache.get(&far).is_none());
    }

    #[test]
    fn polygon_unions_vertex_queries() {
        let mut cache = EdgeCache::new(100.0, 8);
        let near = Location("near".to_string());
        cache
            .resolve(
                &FakeNetwork,
                &near,
                &LocationGeometry::Polygon(vec![
                    LonLat::new(0.0, 0.0),
                    LonLat::new(10.0, 10.0),
                    LonLat::new(0.001, 0.001),
                ]),
            )
            .unwrap();
        let sets = cache.get(&near).unwrap();
        // The two near-origin vertices return the same edges; the union dedupes.
        assert_eq!(sets.pedestrian, vec![EdgeID("ped1".to_string())]);
        assert_eq!(sets.vehicle, vec![EdgeID("car1".to_string())]);
    }

    #[test]
    fn empty_polygon_rejected() {
        let mut cache = EdgeCache::new(100.0, 8);
        let bad = Location("bad".to_string());
        assert_eq!(
            cache.resolve(&FakeNetwork, &bad, &LocationGeometry::Polygon(Vec::new())),
            Err(TripError::EmptyPolygon(bad.clone()))
        );
    }

    #[test]
    fn vertex_parsing() {
        assert!(matches!(
            parse_vertices("-86.23 41.70").unwrap(),
            LocationGeometry::Point(_)
        ));
        assert!(matches!(
            parse_vertices("-86.23 41.70;-86.24 41.71").unwrap(),
            LocationGeometry::Polygon(_)
        ));
        assert!(parse_vertices("oops").is_err());
        assert!(parse_vertices("").is_err());
    }
}
