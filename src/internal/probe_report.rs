//! Fills both maps with random keys, reports how far lookups travel at each fill
//! level and renders the averages to `probe_lengths.png`. Finishes with the mode of
//! a batch of random dice rolls.

#![allow(
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss,
    clippy::indexing_slicing
)]

use std::error::Error;

use bucketry::{ChainedHashMap, MapError, OpenAddressingMap, find_mode};
use log::info;
use plotters::prelude::*;
use rand::Rng;

/// Number of keys inserted for each measurement
const FILL_LEVELS: [usize; 8] = [100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 200_000];
/// Rolls of two dice fed to the mode finder
const DICE_ROLLS: usize = 10_000;
/// Where the chart is written
const PLOT_PATH: &str = "probe_lengths.png";
/// Font used for every label of the chart
const FONT_FAMILY: &str = "sans-serif";

/// Lookup costs of both maps after inserting the same keys
#[derive(Debug)]
struct FillStats {
    /// Keys inserted
    keys: usize,
    /// Slots of the open addressing map
    open_capacity: usize,
    /// Occupied and tombstoned share of those slots
    open_load: f64,
    /// Mean slots inspected to find a key
    average_probes: f64,
    /// Most slots inspected for a single key
    worst_probes: usize,
    /// Buckets of the chaining map
    chained_capacity: usize,
    /// Entries per bucket
    chained_load: f64,
    /// Mean length of the non-empty chains
    average_chain: f64,
    /// Longest chain
    longest_chain: usize,
}

/// Mean of `values`, zero when there are none
fn average(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

/// Inserts `keys` into fresh maps and collects their lookup costs
fn measure(keys: &[u64]) -> Result<FillStats, MapError> {
    let mut open = OpenAddressingMap::new();
    let mut chained = ChainedHashMap::new();
    for &key in keys {
        open.insert(key, ())?;
        chained.insert(key, ())?;
    }

    let probes: Vec<usize> = keys.iter().filter_map(|key| open.probe_length(key)).collect();
    let chains: Vec<usize> = chained.chain_lengths().filter(|&len| len > 0).collect();

    Ok(FillStats {
        keys: keys.len(),
        open_capacity: open.capacity(),
        open_load: open.load_factor(),
        average_probes: average(&probes),
        worst_probes: probes.iter().copied().max().unwrap_or(0),
        chained_capacity: chained.capacity(),
        chained_load: chained.load_factor(),
        average_chain: average(&chains),
        longest_chain: chains.iter().copied().max().unwrap_or(0),
    })
}

/// Draws the average probe and chain lengths against the number of keys
fn plot(stats: &[FillStats]) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(PLOT_PATH, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_y = stats
        .iter()
        .flat_map(|s| [s.average_probes, s.average_chain])
        .fold(1.0_f64, f64::max)
        * 1.1; // Add 10% margin
    let x_labels: Vec<String> = stats.iter().map(|s| s.keys.to_string()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption("Average Lookup Cost by Collision Strategy", (FONT_FAMILY, 35))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .right_y_label_area_size(10)
        .build_cartesian_2d(0..stats.len().saturating_sub(1), 0.0..max_y)?;

    chart
        .configure_mesh()
        .x_labels(stats.len())
        .x_label_formatter(&|x| x_labels.get(*x).cloned().unwrap_or_default())
        .x_desc("Number of Keys Inserted")
        .y_desc("Slots or Entries Inspected")
        .axis_desc_style((FONT_FAMILY, 16))
        .draw()?;

    let series = [
        (
            "Quadratic probing (average probes)",
            RGBColor(220, 50, 50),
            stats.iter().map(|s| s.average_probes).collect::<Vec<_>>(),
        ),
        (
            "Separate chaining (average chain)",
            RGBColor(50, 90, 220),
            stats.iter().map(|s| s.average_chain).collect::<Vec<_>>(),
        ),
    ];

    for (name, color, values) in series {
        let line_style = ShapeStyle::from(&color).stroke_width(2);
        chart
            .draw_series(LineSeries::new(values.iter().copied().enumerate(), line_style))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_style));
        chart.draw_series(
            values.iter().copied().enumerate().map(|point| Circle::new(point, 4, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Prints the fill table, writes the chart and rolls the dice
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut rng = rand::rng();
    let max_keys = FILL_LEVELS.iter().copied().max().unwrap_or(0);
    let keys: Vec<u64> = (0..max_keys).map(|_| rng.random()).collect();

    let mut stats = Vec::with_capacity(FILL_LEVELS.len());
    for &n_keys in &FILL_LEVELS {
        info!("measuring {n_keys} keys");
        stats.push(measure(&keys[..n_keys])?);
    }

    println!(
        "{:>8} | {:>8} {:>5} {:>9} {:>6} | {:>8} {:>5} {:>9} {:>7}",
        "keys", "slots", "load", "avg probe", "worst", "buckets", "load", "avg chain", "longest"
    );
    for s in &stats {
        println!(
            "{:>8} | {:>8} {:>5.2} {:>9.2} {:>6} | {:>8} {:>5.2} {:>9.2} {:>7}",
            s.keys,
            s.open_capacity,
            s.open_load,
            s.average_probes,
            s.worst_probes,
            s.chained_capacity,
            s.chained_load,
            s.average_chain,
            s.longest_chain
        );
    }

    plot(&stats)?;
    println!("Generated plot image: {PLOT_PATH}");

    let rolls = (0..DICE_ROLLS).map(|_| rng.random_range(1..=6_u8) + rng.random_range(1..=6_u8));
    let mode = find_mode(rolls)?.sorted();
    println!(
        "Most frequent total of two dice over {DICE_ROLLS} rolls: {:?} ({} times)",
        mode.values(),
        mode.frequency()
    );

    Ok(())
}
