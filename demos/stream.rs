use anyhow::Result;
use libwavedac_rs::spi::{DEFAULT_CLOCK_HZ, SpidevBus};
use libwavedac_rs::{Segment, Shape, Span, WaveDac, WaveformRequest};
use std::thread::sleep;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let bus = SpidevBus::open("/dev/spidev0.0", DEFAULT_CLOCK_HZ)?;
    let mut dac = WaveDac::new(bus);
    dac.set_span(Span::Bipolar10);

    // half-sine at 5 V over the first half of the period, a falling ramp
    // at 2 V over the last quarter, a silent gap between them
    let request = WaveformRequest::new(
        vec![
            Segment::new(Shape::Sine, 5.0, 0.0, 0.5),
            Segment::new(Shape::InverseSawtooth, 2.0, 0.75, 1.0),
        ],
        500,
    )?;

    let table = dac.compute(&request);
    println!(
        "streaming {} codes per period, first frame {}",
        table.rows.len(),
        table.rows[0].frame_hex()
    );

    dac.start()?;
    sleep(Duration::from_secs(10));
    dac.stop();

    println!("stopped ({} wrap events)", dac.wrap_events());
    Ok(())
}
