//! Command-line front end
//!
//! `zedbridge decode` scans image files; `zedbridge encode` writes a QR
//! symbol to a PNG. Exit status follows zbarimg: 0 when something was
//! decoded or written, 4 when no symbol was found, 1 on error.

use std::process;

use clap::{Parser, Subcommand};
use zedbridge::{
    decode, encode, BarcodeFormat, Binarizer, ChannelLayout, EccLevel, EncodeOptions, Hints,
    PixelBufferView,
};

const EXIT_NOT_FOUND: i32 = 4;

#[derive(Parser)]
#[command(name = "zedbridge")]
#[command(version)]
#[command(about = "Decode and encode barcodes through the zedbridge boundary", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one or more image files
    Decode {
        /// Single attempt with the chosen binarizer
        #[arg(long)]
        fast: bool,

        /// local, histogram or threshold=N
        #[arg(long, default_value = "local", value_parser = parse_binarizer)]
        binarizer: Binarizer,

        /// Only print decoded data
        #[arg(long)]
        raw: bool,

        /// Also print symbol corners
        #[arg(short, long)]
        verbose: bool,

        /// Image files to scan
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Render text as a QR code PNG
    Encode {
        text: String,

        /// Output PNG path
        #[arg(short, long)]
        output: String,

        /// Output width and height in pixels (0 = one pixel per module)
        #[arg(long, default_value_t = 0)]
        size: usize,

        /// Quiet zone in modules
        #[arg(long, default_value_t = 4)]
        margin: usize,

        /// Error correction level, 0 (L) to 3 (H)
        #[arg(long, default_value_t = 0)]
        ecc: u32,
    },
}

fn parse_binarizer(value: &str) -> Result<Binarizer, String> {
    match value {
        "local" => Ok(Binarizer::LocalAverage),
        "histogram" => Ok(Binarizer::GlobalHistogram),
        _ => value
            .strip_prefix("threshold=")
            .and_then(|n| n.parse::<u8>().ok())
            .map(Binarizer::Threshold)
            .ok_or_else(|| format!("expected local, histogram or threshold=0..255, got '{value}'")),
    }
}

fn run_decode(files: &[String], hints: &Hints, raw: bool, verbose: bool) -> i32 {
    let mut found = 0;

    for filename in files {
        let img = match ::image::ImageReader::open(filename) {
            Ok(reader) => match reader.decode() {
                Ok(img) => img,
                Err(e) => {
                    eprintln!("Failed to decode image '{}': {}", filename, e);
                    return 1;
                }
            },
            Err(e) => {
                eprintln!("Failed to open image '{}': {}", filename, e);
                return 1;
            }
        };

        let rgb = img.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let view = match PixelBufferView::new(
            rgb.as_raw(),
            width,
            height,
            width * 3,
            3,
            ChannelLayout::RGB,
        ) {
            Ok(view) => view,
            Err(e) => {
                eprintln!("'{}': {}", filename, e);
                return 1;
            }
        };

        let result = decode(&view, hints);
        let (Some(format), Some(text)) = (result.format(), result.text()) else {
            log::info!("{}: {}", filename, result.status());
            continue;
        };
        found += 1;

        if raw {
            println!("{text}");
        } else {
            println!("{format}:{text}");
        }
        if verbose {
            if let Some(corners) = result.corners() {
                let points: Vec<String> =
                    corners.iter().map(|p| format!("({},{})", p.x, p.y)).collect();
                eprintln!("  corners: {}", points.join(" "));
            }
        }
    }

    if found == 0 {
        eprintln!("No barcodes found");
        EXIT_NOT_FOUND
    } else {
        eprintln!("scanned {} barcode symbols from {} image(s)", found, files.len());
        0
    }
}

fn run_encode(text: &str, output: &str, size: usize, margin: usize, ecc: u32) -> i32 {
    let options = match EccLevel::try_from(ecc) {
        Ok(level) => EncodeOptions::new()
            .size(size, size)
            .margin(margin)
            .ecc_level(level),
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let encoded = match encode(text, BarcodeFormat::QrCode, &options) {
        Ok(encoded) => encoded,
        Err(e) => {
            eprintln!("Failed to encode: {e}");
            return 1;
        }
    };

    let (width, height) = (encoded.width as u32, encoded.height as u32);
    let Some(img) = ::image::GrayImage::from_raw(width, height, encoded.into_pixels().into_vec())
    else {
        eprintln!("Encoded raster does not match its dimensions");
        return 1;
    };
    if let Err(e) = img.save(output) {
        eprintln!("Failed to write '{}': {}", output, e);
        return 1;
    }
    eprintln!("wrote {}x{} symbol to {}", width, height, output);
    0
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let code = match args.command {
        Command::Decode {
            fast,
            binarizer,
            raw,
            verbose,
            files,
        } => {
            let hints = Hints::new().try_harder(!fast).binarizer(binarizer);
            run_decode(&files, &hints, raw, verbose)
        }
        Command::Encode {
            text,
            output,
            size,
            margin,
            ecc,
        } => run_encode(&text, &output, size, margin, ecc),
    };
    process::exit(code);
}
