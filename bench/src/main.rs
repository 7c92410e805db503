//! Simple benchmark suite for deltastrip.
//!
//! Each PNG in a directory is treated as one frame of a stream; frames are
//! fed to the encoder/decoder in file-name order, each one referenced
//! against the previous (the first frame in a directory sees an empty
//! reference). Sizes are compared against a naive always-RAW baseline of
//! `width * height * 3` bytes.

use std::{
    fs::File,
    io::BufReader,
    path::Path,
    time::{Duration, Instant},
};

use deltastrip::{decode_frame, encode_frame, PixelSource, RasterBuf, SliceSource, VecSink};

fn ns() -> Instant {
    Instant::now()
}

// -----------------------------------------------------------------------------
// benchmark runner

struct BenchmarkLibResult {
    size: u64,
    encode_time: Duration,
    decode_time: Duration,
}

struct BenchmarkResult {
    count: u32,
    px: u64,
    w: u32,
    h: u32,
    deltastrip: BenchmarkLibResult,
    raw_baseline: BenchmarkLibResult,
}

impl BenchmarkResult {
    fn zero() -> Self {
        BenchmarkResult {
            count: 0,
            px: 0,
            w: 0,
            h: 0,
            deltastrip: BenchmarkLibResult { size: 0, encode_time: Duration::ZERO, decode_time: Duration::ZERO },
            raw_baseline: BenchmarkLibResult { size: 0, encode_time: Duration::ZERO, decode_time: Duration::ZERO },
        }
    }
}

#[inline(never)]
fn benchmark_fn(runs: u32, avg_time: &mut Duration, mut f: impl FnMut()) {
    f();

    let mut time = Duration::ZERO;
    for _ in 0..runs {
        let time_start = ns();
        f();
        time += time_start.elapsed();
    }

    *avg_time = time / runs;
}

fn raster_from_rgba(image: &image::RgbaImage) -> RasterBuf {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let mut raster = RasterBuf::new(w, h);
    for (x, y, px) in image.enumerate_pixels() {
        raster.set(x as i32, y as i32, deltastrip::Pixel::new(px[0], px[1], px[2]));
    }
    raster
}

fn benchmark_frame(current: &RasterBuf, reference: &RasterBuf, runs: u32) -> BenchmarkResult {
    let mut res = BenchmarkResult::zero();

    let w = current.width() as u32;
    let h = current.height() as u32;
    res.count = 1;
    res.px = w as u64 * h as u64;
    res.w = w;
    res.h = h;
    res.raw_baseline.size = res.px * 3;

    let mut encoded = Vec::new();
    let size = &mut res.deltastrip.size;
    benchmark_fn(runs, &mut res.deltastrip.encode_time, || {
        let mut sink = VecSink::new();
        encode_frame(current, reference, &mut sink).unwrap();
        encoded = sink.into_inner();
        *size = encoded.len() as u64;
    });

    benchmark_fn(runs, &mut res.deltastrip.decode_time, || {
        let mut decoded = RasterBuf::new(current.width(), current.height());
        let mut source = SliceSource::new(&encoded);
        decode_frame(&mut decoded, reference, current.bounds(), &mut source).unwrap();
    });

    res
}

fn benchmark_print_result(res: &BenchmarkResult) {
    let px = res.px as f64;
    println!("               decode ms   encode ms   decode mpps   encode mpps   size kb");
    println!(
        "deltastrip:     {:8.3}    {:8.3}      {:8.3}      {:8.3}  {:8}",
        res.deltastrip.decode_time.as_secs_f64() * 1000.0,
        res.deltastrip.encode_time.as_secs_f64() * 1000.0,
        if res.deltastrip.decode_time.is_zero() {
            0.0
        } else {
            px / (res.deltastrip.decode_time.as_secs_f64() * 1_000_000.0)
        },
        if res.deltastrip.encode_time.is_zero() {
            0.0
        } else {
            px / (res.deltastrip.encode_time.as_secs_f64() * 1_000_000.0)
        },
        res.deltastrip.size / 1024,
    );
    println!(
        "raw baseline:                                                     {:8}",
        res.raw_baseline.size / 1024,
    );
    println!();
}

fn benchmark_directory(dirpath: &Path, runs: u32, grand_total: &mut BenchmarkResult) {
    println!("## Benchmarking {}/*.png -- {} runs", dirpath.display(), runs);

    let dir = std::fs::read_dir(dirpath).expect("Couldn't open directory");
    let mut entries: Vec<_> = dir.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut dir_total = BenchmarkResult::zero();
    let mut reference: Option<RasterBuf> = None;

    for entry in entries {
        let ft = entry.file_type().unwrap();
        let filepath = entry.path();

        if ft.is_file() {
            if filepath.extension().map_or(false, |e| e == "png") {
                let image = match image::load(
                    BufReader::new(File::open(&filepath).unwrap()),
                    image::ImageFormat::Png,
                ) {
                    Ok(image) => image,
                    Err(err) => {
                        eprintln!("Failed to open PNG image {} : {:#}", filepath.display(), err);
                        continue;
                    }
                };
                let current = raster_from_rgba(&image.to_rgba8());
                let empty = RasterBuf::new(0, 0);
                let res = benchmark_frame(&current, reference.as_ref().unwrap_or(&empty), runs);

                dir_total.count += res.count;
                dir_total.px += res.px;
                dir_total.deltastrip.encode_time += res.deltastrip.encode_time;
                dir_total.deltastrip.decode_time += res.deltastrip.decode_time;
                dir_total.deltastrip.size += res.deltastrip.size;
                dir_total.raw_baseline.size += res.raw_baseline.size;

                grand_total.count += res.count;
                grand_total.px += res.px;
                grand_total.deltastrip.encode_time += res.deltastrip.encode_time;
                grand_total.deltastrip.decode_time += res.deltastrip.decode_time;
                grand_total.deltastrip.size += res.deltastrip.size;
                grand_total.raw_baseline.size += res.raw_baseline.size;

                reference = Some(current);
            }
        } else if ft.is_dir() {
            benchmark_directory(&filepath, runs, grand_total);
        }
    }

    if dir_total.count > 0 {
        dir_total.px /= dir_total.count as u64;
        dir_total.deltastrip.encode_time /= dir_total.count;
        dir_total.deltastrip.decode_time /= dir_total.count;
        dir_total.deltastrip.size /= dir_total.count as u64;
        dir_total.raw_baseline.size /= dir_total.count as u64;

        println!("## Total for {}\n", dirpath.display());
        benchmark_print_result(&dir_total);
    }
}

fn main() -> Result<(), ()> {
    let mut args = std::env::args();

    if args.len() < 3 {
        eprintln!("Usage: bench <iterations> <directory>");
        eprintln!("Example: bench 10 images/textures/");
        return Err(());
    }

    args.next();
    let mut runs = args.next().unwrap().parse().unwrap();
    if runs < 1 {
        runs = 1;
    }

    let dirpath = args.next().unwrap();
    let mut grand_total = BenchmarkResult::zero();

    benchmark_directory(dirpath.as_ref(), runs, &mut grand_total);

    println!();

    if grand_total.count > 0 {
        grand_total.px /= grand_total.count as u64;
        grand_total.deltastrip.encode_time /= grand_total.count;
        grand_total.deltastrip.decode_time /= grand_total.count;
        grand_total.deltastrip.size /= grand_total.count as u64;
        grand_total.raw_baseline.size /= grand_total.count as u64;

        println!("# Grand total for {}\n", dirpath);
        benchmark_print_result(&grand_total);
    }

    Ok(())
}
