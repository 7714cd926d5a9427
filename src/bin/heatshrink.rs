use clap::{ArgGroup, Parser};
use heatshrink::{Coder, DEFAULT_INPUT_BUFFER_SIZE, DEFAULT_LOOKAHEAD_SZ2, DEFAULT_WINDOW_SZ2};
use std::fs::File;
use std::io::{Read, Write};
use std::process::ExitCode;

const HEATSHRINK_APP_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser)] // requires `derive` feature
#[clap(author, version, about, long_about = None)]
#[clap(group(ArgGroup::new("command").required(true).args(&["encode", "decode"])))]
struct Cli {
    #[clap(short = 'e', long = "encode", help = "Compress data")]
    encode: bool,

    #[clap(short = 'd', long = "decode", help = "Decompress data")]
    decode: bool,

    #[clap(
        short = 'v',
        long = "verbose",
        help = "Print input & output sizes, compression ratio, etc."
    )]
    verbose: bool,

    #[clap(
        short = 'w',
        long = "window-sz2",
        default_value_t = DEFAULT_WINDOW_SZ2,
        help = "Base-2 log of the sliding window size"
    )]
    window_sz2: u8,

    #[clap(
        short = 'l',
        long = "lookahead-sz2",
        default_value_t = DEFAULT_LOOKAHEAD_SZ2,
        help = "Base-2 log of the maximum back-reference length"
    )]
    lookahead_sz2: u8,

    /// some regular input
    #[clap(group = "input")]
    input_file: Option<String>,

    /// some regular output
    #[clap(group = "output")]
    output_file: Option<String>,
}

fn report(file_name: &str, input_file: &File, output_file: &File, cli: &Cli) {
    let input_len = input_file.metadata().unwrap().len();
    let output_len = output_file.metadata().unwrap().len();

    println!(
        "{0:} {1:.2}% \t{2:} -> {3:} (-w {4:} -l {5:})",
        file_name,
        100.0 - (100.0 * output_len as f32) / input_len as f32,
        input_len,
        output_len,
        cli.window_sz2,
        cli.lookahead_sz2,
    );
}

fn encode(
    mut input_file: &File,
    mut output_file: &File,
    window_sz2: u8,
    lookahead_sz2: u8,
) -> Result<(), heatshrink::HeatshrinkError> {
    let writer = heatshrink::encoder::Writer::new(window_sz2, lookahead_sz2)?;
    let mut coder = Coder::new(writer);
    let mut buf = vec![0u8; HEATSHRINK_APP_BUFFER_SIZE];

    loop {
        let n = input_file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        log::debug!("read {n} bytes of plaintext");
        let out = coder.fill(&buf[..n])?;
        if !out.is_empty() {
            output_file.write_all(&out)?;
        }
    }

    let out = coder.finish()?;
    if !out.is_empty() {
        output_file.write_all(&out)?;
    }
    Ok(())
}

fn decode(
    mut input_file: &File,
    mut output_file: &File,
    input_buffer_size: usize,
    window_sz2: u8,
    lookahead_sz2: u8,
) -> Result<(), heatshrink::HeatshrinkError> {
    let reader = heatshrink::decoder::Reader::new(input_buffer_size, window_sz2, lookahead_sz2)?;
    let mut coder = Coder::new(reader);
    let mut buf = vec![0u8; HEATSHRINK_APP_BUFFER_SIZE];

    loop {
        let n = input_file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        log::debug!("read {n} bytes of compressed data");
        let out = coder.fill(&buf[..n])?;
        if !out.is_empty() {
            output_file.write_all(&out)?;
        }
    }

    let out = coder.finish()?;
    if !out.is_empty() {
        output_file.write_all(&out)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Cli::parse();

    let input_file = match File::open(args.input_file.as_ref().unwrap()) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("heatshrink: {err}");
            return ExitCode::FAILURE;
        }
    };
    let output_file = match File::create(args.output_file.as_ref().unwrap()) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("heatshrink: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = if args.encode {
        encode(&input_file, &output_file, args.window_sz2, args.lookahead_sz2)
    } else {
        decode(
            &input_file,
            &output_file,
            DEFAULT_INPUT_BUFFER_SIZE,
            args.window_sz2,
            args.lookahead_sz2,
        )
    };

    if let Err(err) = result {
        eprintln!("heatshrink: {err}");
        return ExitCode::FAILURE;
    }

    if args.verbose {
        report(args.input_file.as_ref().unwrap(), &input_file, &output_file, &args);
    }

    ExitCode::SUCCESS
}
