use image::ImageReader;
use waterline::detect::{check_target_moved, find_water_level};
use waterline::WaterlineConfig;

#[cfg(feature = "tracing")]
use waterline::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use {log::LevelFilter, waterline::core::init_with_level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    init_with_level(LevelFilter::Info)?;

    let mut args = std::env::args().skip(1);
    let (Some(calib_path), Some(image_path)) = (args.next(), args.next()) else {
        eprintln!("Usage: measure <calib.json> <frame.png> [config.json]");
        return Ok(());
    };
    let cfg = match args.next() {
        Some(path) => WaterlineConfig::load_json(path)?,
        None => WaterlineConfig::default(),
    };

    let mut calib = cfg.new_calib();
    calib.load(&calib_path)?;
    let img = ImageReader::open(&image_path)?.decode()?.to_luma8();
    let mut finder = cfg.build_finder(calib.image_size())?;

    match check_target_moved(&img, &calib, &mut finder, cfg.move_tolerance_px) {
        Ok(check) if check.moved => println!("target moved by {:.2}px", check.drift.max_px),
        Ok(check) => println!("target steady (max offset {:.2}px)", check.drift.max_px),
        Err(e) => println!("move check failed: {e}"),
    }

    let level = find_water_level(&img, &calib, &finder)?;
    println!(
        "water level {:.3} (pixel y {:.1}, angle {:.2} deg, {} of {} swaths used)",
        level.level(),
        level.pixel.line.center.y,
        level.pixel.line.angle_deg,
        level.pixel.inliers.len(),
        level.pixel.found_points.len()
    );
    Ok(())
}
