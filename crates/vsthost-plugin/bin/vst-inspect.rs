//! Plugin inspection entry point
//!
//! Loads the plugin given as the first argument, logs what it reports about
//! itself, then renders one block of silence and logs the output peak.

use std::env;
use vsthost_plugin::{CanDoFeature, HostConfig, Result, Session};

const BLOCK_SIZE: usize = 512;
const SAMPLE_RATE: f32 = 44100.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: vst-inspect <plugin>");
        std::process::exit(2);
    };

    let config = HostConfig::default()
        .block_size(BLOCK_SIZE)
        .sample_rate(SAMPLE_RATE);
    let session = Session::load_with(&path, config)?;
    let metadata = session.metadata();

    tracing::info!(
        name = %metadata.name,
        id = %metadata.unique_id_code(),
        version = metadata.version,
        inputs = metadata.inputs,
        outputs = metadata.outputs,
        latency = metadata.latency_samples,
        editor = metadata.has_editor(),
        synth = metadata.is_synth(),
        "plugin"
    );
    for program in &metadata.programs {
        tracing::info!(index = program.index, name = %program.name, "program");
    }
    for parameter in &metadata.parameters {
        tracing::info!(
            index = parameter.index,
            name = %parameter.name,
            value = %parameter.display,
            label = %parameter.label,
            "parameter"
        );
    }
    for feature in CanDoFeature::ALL {
        if session.can_do_feature(feature) {
            tracing::info!(%feature, "can do");
        }
    }

    session.set_block_size(BLOCK_SIZE);
    let mut outputs: Vec<Vec<f32>> = vec![vec![0.0; BLOCK_SIZE]; metadata.outputs.max(1)];
    let mut channels: Vec<&mut [f32]> = outputs.iter_mut().map(Vec::as_mut_slice).collect();
    session.process_replacing(None, &mut channels, BLOCK_SIZE);

    let peak = outputs
        .iter()
        .flatten()
        .fold(0.0f32, |peak, sample| peak.max(sample.abs()));
    tracing::info!(peak, "rendered one block of silence");

    session.dispose();
    Ok(())
}
