//! Parses a message from stdin (or a built-in sample if stdin is empty) and
//! prints the validated result with `ims_parser::pretty::Pretty`.

use std::io::Read;

use ims_parser::pretty::Pretty;

const SAMPLE: &str = "BEGIN IMS2.0\n\
MSG_TYPE request\n\
MSG_ID 1 example\n\
WAVEFORM\n\
TIME 2020/01/01 to 2020/01/02\n\
STA_LIST ABC,DEF\n\
STOP\n";

fn main() {
    env_logger::init();

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input).ok();
    let input = if input.trim().is_empty() { SAMPLE.to_string() } else { input };

    match ims_parser::parse_message(&input) {
        Ok(message) => print!("{}", Pretty(&message)),
        Err(e) => eprintln!("{e}"),
    }
}
