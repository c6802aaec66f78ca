use anyhow::Result;
use chrono::Local;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

mod client;
mod config;
mod mix;
mod models;


use crate::client::SubsonicClient;
use crate::config::load_config;
use crate::mix::{MixConfig, TargetSpec, format_duration_ms};
use crate::models::Track;

#[derive(Parser)]
#[command(name = "playlist-mixer")]
#[command(about = "Mixes OpenSubsonic playlists into one according to weights and popularity shapes")]
#[command(version)]
struct Args {
    /// Path to the mix configuration JSON file
    #[arg(short = 'c', long = "config", default_value = "mixes.json")]
    config_file: String,

    /// Enable debug mode - print the mixed tracklist to stdout instead of uploading
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Quiet mode - reduce output verbosity
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Seed for the random source, for reproducible shuffles
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Validate that the mix configuration file exists before proceeding
    if !std::path::Path::new(&args.config_file).exists() {
        eprintln!(
            "Error: Mix configuration file '{}' not found.",
            args.config_file
        );
        eprintln!("Please ensure the file exists or specify a different file with --config.");
        return Err(anyhow::anyhow!(
            "Configuration file '{}' not found",
            args.config_file
        ));
    }

    // Load configuration from .env
    let config = load_config()?;

    // Initialize API client
    let client = SubsonicClient::new(config);

    // Test connection first
    println!("Testing API connection...");
    match client.ping() {
        Ok(_) => println!("✓ API connection successful"),
        Err(e) => {
            eprintln!("✗ API connection failed: {e}");
            return Err(e);
        }
    }

    // Load mix configurations from JSON file
    println!("\nLoading mix configurations from: {}", args.config_file);
    let mix_configs = match MixConfig::load_all_from_file(&args.config_file) {
        Ok(configs) => {
            println!("Loaded {} mix configurations", configs.len());
            configs
        }
        Err(e) => {
            eprintln!("Failed to load mix configurations: {e}");
            return Err(anyhow::anyhow!("Failed to load mix configurations: {}", e));
        }
    };

    // One random source for the whole run so a single seed reproduces it all
    let mut rng = match args.seed {
        Some(seed) => {
            println!("Using fixed random seed: {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let mut creation_results = Vec::new();

    for mix_config in &mix_configs {
        println!("\n{}", mix_config.name);
        println!("{}", "=".repeat(mix_config.name.len()));

        // Fetch every source pool before mixing
        let mut pools: HashMap<String, Vec<Track>> = HashMap::new();
        let mut fetch_failed = false;
        for source in &mix_config.sources {
            let label = source.source_label();
            match client.fetch_playlist_tracks(&source.playlist_id, &label) {
                Ok(tracks) => {
                    if !args.quiet {
                        println!(
                            "Fetched {} tracks for source '{}' (playlist {})",
                            tracks.len(),
                            label,
                            source.playlist_id
                        );
                    }
                    pools.insert(label, tracks);
                }
                Err(e) => {
                    eprintln!(
                        "✗ Failed to fetch playlist {} for source '{}': {}",
                        source.playlist_id, label, e
                    );
                    fetch_failed = true;
                }
            }
        }

        if fetch_failed {
            creation_results.push((
                mix_config.name.clone(),
                false,
                "Source fetch failed".to_string(),
            ));
            continue;
        }

        let quotas = mix_config.quotas();
        let output = match mix::mix(
            pools,
            &quotas,
            &mix_config.target,
            &mix_config.strategy,
            &mut rng,
        ) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("✗ Invalid mix configuration '{}': {}", mix_config.name, e);
                creation_results.push((mix_config.name.clone(), false, format!("Error: {e}")));
                continue;
            }
        };

        if output.tracks.is_empty() {
            println!("Nothing to mix - all source pools are empty, skipping playlist creation.");
            creation_results.push((
                mix_config.name.clone(),
                false,
                "No tracks available".to_string(),
            ));
            continue;
        }

        // Compare requested vs returned length for a shortfall warning
        match mix_config.target {
            TargetSpec::Count(requested) => {
                if output.tracks.len() < requested {
                    println!(
                        "⚠️ Shortfall: requested {} tracks but only {} were available",
                        requested,
                        output.tracks.len()
                    );
                }
            }
            TargetSpec::Duration(requested_ms) => {
                if output.stats.total_duration_ms < requested_ms {
                    println!(
                        "⚠️ Shortfall: requested {} of music but only {} was available",
                        format_duration_ms(requested_ms),
                        format_duration_ms(output.stats.total_duration_ms)
                    );
                }
            }
        }

        // Display mix composition
        println!("\n📊 Mix Details:");
        println!(
            "   Tracks: {} | Duration: {}",
            output.stats.total_count,
            format_duration_ms(output.stats.total_duration_ms)
        );
        for quota in &quotas {
            let stats = output
                .stats
                .per_source
                .get(&quota.source)
                .copied()
                .unwrap_or_default();
            println!(
                "   {}: {} tracks ({:.0}%) | {} ({:.0}%)",
                quota.source,
                stats.count,
                output.stats.count_share(&quota.source) * 100.0,
                format_duration_ms(stats.duration_ms),
                output.stats.duration_share(&quota.source) * 100.0
            );
        }

        // Collect track IDs for the API call
        let track_ids: Vec<String> = output.tracks.iter().map(|t| t.id.clone()).collect();

        let playlist_name = format!("{} {}", mix_config.name, Local::now().format("%Y-%m-%d"));

        if args.debug {
            // Debug mode: print the tracklist instead of uploading
            println!(
                "\n🔍 DEBUG MODE: Mix '{}' (would create via API as '{}')",
                mix_config.name, playlist_name
            );

            if !args.quiet {
                for (i, t) in output.tracks.iter().enumerate() {
                    let popularity_display = t
                        .popularity
                        .map(|p| format!(" ({p} plays)"))
                        .unwrap_or_default();
                    println!(
                        "     {}. \"{}\" by {} [{}]{} {}",
                        i + 1,
                        t.title,
                        t.artist,
                        t.source,
                        popularity_display,
                        format_duration_ms(t.duration_ms)
                    );
                }
            }

            creation_results.push((
                mix_config.name.clone(),
                true,
                "Debug mode - not uploaded".to_string(),
            ));
        } else {
            println!("\n🎵 Creating playlist '{playlist_name}' via API...");
            match client.create_mixed_playlist(&playlist_name, &mix_config.name, &track_ids) {
                Ok(playlist_id) => {
                    println!(
                        "✓ Successfully created playlist '{playlist_name}' with ID: {playlist_id}"
                    );
                    creation_results.push((
                        mix_config.name.clone(),
                        true,
                        format!("Created with ID: {playlist_id}"),
                    ));
                }
                Err(e) => {
                    eprintln!("✗ Failed to create playlist '{playlist_name}': {e}");
                    creation_results.push((mix_config.name.clone(), false, format!("Error: {e}")));
                }
            }
        }
    }

    // Summary of playlist creation results (suitable for cron job monitoring)
    println!("\n=== PLAYLIST CREATION SUMMARY ===");
    let successful_creations = creation_results
        .iter()
        .filter(|(_, success, _)| *success)
        .count();
    let total_attempts = creation_results.len();

    println!("Successfully created {successful_creations}/{total_attempts} playlists");

    for (name, success, message) in &creation_results {
        let status = if *success { "✓" } else { "✗" };
        println!("{status} {name}: {message}");
    }

    if successful_creations == total_attempts && total_attempts > 0 {
        println!("\n🎉 All mixed playlists created successfully!");
    } else if successful_creations > 0 {
        println!("\n⚠️ Partial success: {successful_creations}/{total_attempts} playlists created.");
    } else {
        println!("\n❌ No playlists were created successfully.");
        return Err(anyhow::anyhow!("Playlist creation failed"));
    }

    Ok(())
}
