//! Property tests for derived metrics and the storage round trip.

use proptest::prelude::*;

use workout_mapper::models::{Coords, Workout, WorkoutType};
use workout_mapper::persistence::{decode, encode, WorkoutRecord};

fn coords() -> impl Strategy<Value = Coords> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coords::new(lat, lng))
}

fn workout() -> impl Strategy<Value = Workout> {
    prop_oneof![
        (coords(), 0.1f64..600.0, 0.1f64..200.0, 1u32..300)
            .prop_map(|(c, duration, distance, cadence)| Workout::running(c, duration, distance, cadence)),
        (coords(), 0.1f64..600.0, 0.1f64..200.0, -500.0f64..3000.0).prop_map(
            |(c, duration, distance, gain)| Workout::cycling(c, duration, distance, gain)
        ),
    ]
}

proptest! {
    #[test]
    fn test_pace_is_exact(duration in 0.1f64..1000.0, distance in 0.01f64..500.0, cadence in 1u32..400) {
        let w = Workout::running(Coords::new(0.0, 0.0), duration, distance, cadence);
        prop_assert_eq!(w.pace(), Some(duration / distance));
    }

    #[test]
    fn test_speed_is_exact(duration in 0.1f64..1000.0, distance in 0.01f64..500.0) {
        let w = Workout::cycling(Coords::new(0.0, 0.0), duration, distance, 0.0);
        prop_assert_eq!(w.speed(), Some(distance / (duration / 60.0)));
    }

    #[test]
    fn test_storage_round_trip(workouts in prop::collection::vec(workout(), 0..12)) {
        let blob = encode(&workouts).unwrap();
        let loaded = decode(&blob);
        prop_assert_eq!(loaded.len(), workouts.len());

        for (before, after) in workouts.iter().zip(&loaded) {
            prop_assert_eq!(WorkoutRecord::from(before), WorkoutRecord::from(after));
            prop_assert_eq!(after.pace().is_some(), after.kind() == WorkoutType::Running);
            prop_assert_eq!(after.speed().is_some(), after.kind() == WorkoutType::Cycling);
        }
    }
}
