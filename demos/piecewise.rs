use nalgebra::Vector3;
use quadsim::{ConfigOverrides, FlightSegment, Quadcopter, SegmentOutcome};

// Example usage
fn main() {
    let overrides = ConfigOverrides {
        mass: Some(0.5),
        ..Default::default()
    };
    let mut quad = match Quadcopter::new(true, &overrides) {
        Ok(quad) => quad,
        Err(e) => {
            println!("Invalid configuration: {}", e);
            return;
        }
    };

    let hover = quad.config().mass * quad.config().gravity;
    let segments = [
        FlightSegment::new(hover * 1.2, Vector3::zeros(), 1.0), // climb
        FlightSegment::new(hover, Vector3::new(0.5, 0.0, 0.0), 0.2), // roll in
        FlightSegment::new(hover, Vector3::new(-0.5, 0.0, 0.0), 0.2), // roll out
        FlightSegment::new(hover, Vector3::zeros(), 0.0005), // too short, dropped
        FlightSegment::new(hover, Vector3::new(0.0, 0.0, 0.3), 1.0), // yaw
    ];

    match quad.update_state(&segments) {
        Ok(trajectory) => {
            for (i, outcome) in trajectory.outcomes.iter().enumerate() {
                match outcome {
                    SegmentOutcome::Integrated { rows } => println!("Segment {}: {} samples", i, rows),
                    SegmentOutcome::Dropped { duration, minimum } => {
                        println!("Segment {}: dropped ({} s < {} s)", i, duration, minimum)
                    }
                }
            }

            let state = quad.state();
            println!("Final state after {} samples:", trajectory.len());
            println!(
                "Position: ({:.3}, {:.3}, {:.3})",
                state.position[0], state.position[1], state.position[2]
            );
            println!(
                "Velocity: ({:.3}, {:.3}, {:.3})",
                state.velocity[0], state.velocity[1], state.velocity[2]
            );
            println!(
                "Attitude: ({:.3}, {:.3}, {:.3})",
                state.orientation[0], state.orientation[1], state.orientation[2]
            );
            println!(
                "Rates: ({:.3}, {:.3}, {:.3})",
                state.angular_velocity[0], state.angular_velocity[1], state.angular_velocity[2]
            );
        }
        Err(e) => println!("Simulation failed: {}", e),
    }
}
