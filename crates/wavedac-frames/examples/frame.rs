use wavedac_frames::Frame;
use wavedac_globals::Span;

fn main() {
    // Span select command, as sent twice at the start of a session
    let select = Frame::span_select(Span::Bipolar10);

    // Print debug output of a newly created frame
    println!("{select:#?}");

    // Print display output of a newly created frame
    println!("{select}");

    // Code write for one output sample
    let sample = Frame::sample_write(0x8002);
    println!("{sample}");

    // Get individual fields back out of a frame
    let _addr = sample.addr();
    let _code = sample.code();

    // Hex rendering used by the sample table
    println!("{}", sample.to_hex());
}
