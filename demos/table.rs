use anyhow::Result;
use libwavedac_rs::quantizer::{Calibration, code_hex, quantize};
use libwavedac_rs::synth::{Segment, Shape, WaveformRequest, synthesize};
use libwavedac_rs::Frame;

fn main() -> Result<()> {
    env_logger::init();

    // coarse table so the output fits on a screen
    let request = WaveformRequest::new(
        vec![
            Segment::new(Shape::Sine, 5.0, 0.0, 0.25),
            Segment::new(Shape::Sawtooth, 2.5, 0.25, 0.5),
            Segment::new(Shape::Square, 1.0, 0.6, 0.8),
        ],
        40,
    )?;
    let wave = synthesize(&request);
    let cal = Calibration::default();

    println!("{:>8} {:>10} {:>6} {:>8}", "t", "volts", "code", "frame");
    for (t, &volts) in wave.axis.iter().zip(&wave.samples) {
        let (code, _) = quantize(volts, &cal);
        let frame = Frame::sample_write(code);
        println!(
            "{t:8.4} {volts:10.5} {:>6} {:>8}",
            code_hex(code),
            frame.to_hex()
        );
    }
    Ok(())
}
