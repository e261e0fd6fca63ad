use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    episodes: Option<PathBuf>,
    null_audio: bool,
    play: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    let Some(episodes_path) = args.episodes else {
        print_help();
        anyhow::bail!("missing episode list path");
    };

    podcastr::app::run_with_startup(podcastr::app::AppStartupOptions {
        episodes_path,
        null_audio: args.null_audio,
        play_index: args.play,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--null-audio" => out.null_audio = true,
            "--play" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--play requires an episode number");
                };
                let number: usize = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--play expects a number, got {value}"))?;
                if number == 0 {
                    anyhow::bail!("--play counts from 1");
                }
                out.play = Some(number - 1);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            path => {
                if out.episodes.is_some() {
                    anyhow::bail!("only one episode list can be given");
                }
                out.episodes = Some(PathBuf::from(path));
            }
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Podcastr");
    println!("  podcastr <episodes.json> [options]");
    println!("  --play N          Start the list at episode N (1-based)");
    println!("  --null-audio      Run with the silent media element");
}
