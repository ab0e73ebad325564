use colored::Colorize;
use quantum_launcher::paths::LauncherPaths;
use quantum_launcher::relocate;
use walkdir::WalkDir;

/// Remove `temp/`, reporting how much space it held
pub fn clean(paths: &LauncherPaths) -> anyhow::Result<()> {
    let temp = paths.temp_dir();
    if !temp.exists() {
        println!("{} Nothing to clean", "✓".green());
        return Ok(());
    }

    let bytes: u64 = WalkDir::new(&temp)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum();

    relocate::remove_tree(&temp)?;
    tracing::info!("Removed {}", temp.display());
    println!(
        "{} Removed {} ({})",
        "✓".green(),
        temp.display(),
        format_size(bytes).bold()
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
