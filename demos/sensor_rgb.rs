//! Example: feed ambient white points to a browser scenario.
//!
//! Run with: `RUST_LOG=debug cargo run --example sensor_rgb`

use std::sync::Arc;

use mdnie_lite::{
    Attribute, ControllerError, MdnieController, MockCoordinateSource, MockTransport, Mode,
    Scenario, TunerConfig, WhitePoint, sample_store,
};

fn main() -> Result<(), ControllerError> {
    // Initialize logging (optional)
    env_logger::init();

    let config = TunerConfig::default();
    let bus = MockTransport::new();
    let controller = MdnieController::register(
        "mdnie",
        Arc::new(sample_store(&config)?),
        config,
        Box::new(bus.clone()),
        Box::new(MockCoordinateSource::new(2989, 3109)),
    );

    controller.set_mode(Mode::Auto.raw())?;
    print!("color_correct: {}", controller.show(Attribute::ColorCorrect)?);

    controller.set_scenario(Scenario::Browser.raw())?;
    for white in [
        WhitePoint::new(255, 250, 245),
        WhitePoint::new(250, 245, 235),
        WhitePoint::new(245, 238, 225),
    ] {
        match controller.apply_ambient_white_point(white) {
            Ok(true) => println!("applied {}", white),
            Ok(false) => println!("ignored {}", white),
            Err(e) => eprintln!("Error applying {}: {}", white, e),
        }
    }

    // Outside the browser the feedback is ignored
    controller.set_scenario(Scenario::Camera.raw())?;
    let applied = controller.apply_ambient_white_point(WhitePoint::new(1, 2, 3))?;
    println!("camera accepts ambient feedback: {}", applied);

    let state = controller.state();
    println!(
        "Current state: scenario={}, mode={}, white point={}",
        state.scenario, state.mode, state.white_point
    );
    println!("{} blocks written", bus.writes().len());
    print!("{}", controller.register_dump()?);

    Ok(())
}
