use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::models::{Coordinate, JitteredRecord, Record};

/// Offsets every plottable coordinate by independent uniform noise in
/// `[-magnitude, magnitude]` degrees. Output is 1:1 with `records`; records
/// without a coordinate pair are carried through unplottable.
pub fn jitter_records<'a, R: Rng + ?Sized>(
    records: &'a [Record],
    magnitude: f64,
    rng: &mut R,
) -> Vec<JitteredRecord<'a>> {
    let magnitude = magnitude.abs();
    records
        .iter()
        .map(|record| JitteredRecord {
            record,
            position: record
                .coordinate
                .map(|coordinate| jitter_coordinate(coordinate, magnitude, rng)),
        })
        .collect()
}

pub fn jitter_coordinate<R: Rng + ?Sized>(coordinate: Coordinate, magnitude: f64, rng: &mut R) -> Coordinate {
    if magnitude == 0.0 {
        return coordinate;
    }
    let noise = Uniform::new_inclusive(-magnitude, magnitude);
    Coordinate {
        lat: coordinate.lat + noise.sample(rng),
        lon: coordinate.lon + noise.sample(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{table, volunteer_row};
    use crate::loader::{parse_table, ID_OFFSET};
    use crate::models::Category;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn jittered_positions_stay_within_magnitude() {
        let rows: Vec<String> = (0..50)
            .map(|i| {
                let lat = format!("{}", 43.0 + i as f64 * 0.01);
                let lon = format!("{}", -79.0 - i as f64 * 0.01);
                volunteer_row("Avery", "Toronto", "5km", (lat.as_str(), lon.as_str()), "Yes", "Yes")
            })
            .collect();
        let records = parse_table(&table(&rows), Category::Volunteer, ID_OFFSET).unwrap();

        for seed in 0..8u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let jittered = jitter_records(&records, 0.005, &mut rng);
            assert_eq!(jittered.len(), records.len());

            for (item, record) in jittered.iter().zip(&records) {
                assert_eq!(item.record.id, record.id);
                let before = record.coordinate.unwrap();
                let moved = item.position.unwrap();
                assert!((moved.lat - before.lat).abs() <= 0.005 + 1e-12);
                assert!((moved.lon - before.lon).abs() <= 0.005 + 1e-12);
            }
        }
    }

    #[test]
    fn missing_coordinates_stay_unplottable() {
        let records = parse_table(
            &table(&[volunteer_row("Jules", "Sudbury", "5km", ("", ""), "Yes", "Yes")]),
            Category::Volunteer,
            ID_OFFSET,
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let jittered = jitter_records(&records, 0.005, &mut rng);
        assert_eq!(jittered.len(), 1);
        assert!(jittered[0].position.is_none());
    }

    #[test]
    fn zero_magnitude_keeps_positions() {
        let before = Coordinate { lat: 46.49, lon: -80.99 };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(jitter_coordinate(before, 0.0, &mut rng), before);
    }
}
