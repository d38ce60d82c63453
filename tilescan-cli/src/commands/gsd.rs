//! Gsd command - ground resolution of tile imagery.

use tilescan::resolution::PixelScale;

use crate::error::CliError;

/// Arguments for the gsd command.
pub struct GsdArgs {
    pub lat: f64,
    pub zoom: u8,
    pub tile_size: u32,
}

/// Run the gsd command.
pub fn run(args: GsdArgs) -> Result<(), CliError> {
    let scale = PixelScale::at(args.lat, args.zoom, args.tile_size)?;

    println!("{:.4} cm/px", scale.gsd_cm());
    println!(
        "Tile: {}px = {:.2} m across at latitude {}, zoom {}",
        scale.tile_size_px(),
        scale.tile_width_cm() / 100.0,
        args.lat,
        args.zoom
    );
    Ok(())
}
