// File: src/bin/main.rs
use clap::{Args, Parser, Subcommand};
use crossterm::style::Stylize;
use eval_core::config::ConfigOverrides;
use eval_core::core::engine::{Dictionaries, SampleReport};
use eval_core::persistence::{artifact_path, load_from_disk};
use eval_core::replay::{replay_dataset, ArtifactLoader};
use eval_core::{logging, EvalError, EvalResult, Evaluator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "am_test", version, about = "Acoustic model evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode and score the emissions stored in an artifact again.
    Rescore(RescoreArgs),
    /// Summarize an emission artifact.
    Inspect {
        artifact: PathBuf,
        /// List every utterance.
        #[arg(long)]
        samples: bool,
    },
}

#[derive(Args)]
struct RescoreArgs {
    artifact: PathBuf,
    /// JSON file with config overrides. Flags win over it.
    #[arg(long)]
    overrides: Option<PathBuf>,
    #[arg(long)]
    test: Option<String>,
    #[arg(long)]
    tokens_dir: Option<PathBuf>,
    #[arg(long)]
    tokens: Option<String>,
    #[arg(long)]
    lexicon: Option<PathBuf>,
    #[arg(long)]
    max_word: Option<usize>,
    #[arg(long)]
    word_separator: Option<String>,
    #[arg(long)]
    replabel: Option<usize>,
    #[arg(long)]
    emission_dir: Option<PathBuf>,
    /// Print target, prediction and error rates per utterance.
    #[arg(long)]
    show: bool,
    #[arg(long)]
    max_load: Option<usize>,
    #[arg(long)]
    shuffle_seed: Option<u64>,
}

impl RescoreArgs {
    fn overrides(&self) -> EvalResult<ConfigOverrides> {
        let file = match &self.overrides {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        let flags = ConfigOverrides {
            test: self.test.clone(),
            tokens_dir: self.tokens_dir.clone(),
            tokens: self.tokens.clone(),
            lexicon: self.lexicon.clone(),
            max_word: self.max_word,
            word_separator: self.word_separator.clone(),
            replabel: self.replabel,
            emission_dir: self.emission_dir.clone(),
            show: self.show.then_some(true),
            max_load: self.max_load,
            shuffle_seed: self.shuffle_seed,
            ..ConfigOverrides::default()
        };
        Ok(file.merged_with(flags))
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Rescore(args) => rescore(&args),
        Command::Inspect { artifact, samples } => inspect(&artifact, samples),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn rescore(args: &RescoreArgs) -> EvalResult<()> {
    let (loaded, stored) = ArtifactLoader.load_with_emissions(&args.artifact)?;
    let mut evaluator = Evaluator::init(loaded, args.overrides()?)?;

    let config = evaluator.config();
    let output = artifact_path(&config.emission_dir, &config.test);
    if same_file(&output, &args.artifact) {
        return Err(EvalError::Config(format!(
            "rescoring would overwrite its input {}; pick another --test or --emission-dir",
            args.artifact.display()
        )));
    }

    let dicts: &Dictionaries = evaluator.dictionaries();
    let mut dataset = replay_dataset(&stored, dicts, evaluator.policy())?;
    let report = evaluator.run(&mut dataset, print_sample)?;

    println!(
        "{} {:.2}%, {} {:.2}%, {} {:.3}s",
        "total WER:".bold(),
        report.wer,
        "total LER:".bold(),
        report.ler,
        "time:".bold(),
        report.elapsed.as_secs_f64()
    );
    println!("{} {}", "saved:".green(), report.artifact.display());
    Ok(())
}

fn print_sample(r: &SampleReport) {
    println!("{} {}", "|T|:".cyan().bold(), r.target);
    println!("{} {}", "|P|:".yellow().bold(), r.prediction);
    println!(
        "[sample: {}, WER: {:.2}%, LER: {:.2}%, total WER: {:.2}%, total LER: {:.2}%, progress: {:.2}%]",
        r.sample_id,
        r.wer,
        r.ler,
        r.total_wer,
        r.total_ler,
        r.progress()
    );
}

fn inspect(path: &Path, samples: bool) -> EvalResult<()> {
    let set = load_from_disk(path)?;
    println!("{} {}", "artifact:".bold(), path.display());
    println!("utterances: {}", set.len());
    match set.num_classes() {
        Some(n) => println!("classes: {n}"),
        None => println!("classes: unknown"),
    }
    println!(
        "transitions: {}",
        if set.transition().is_some() { "yes" } else { "no" }
    );
    let total_frames: usize = set.frames().iter().sum();
    println!("frames: {total_frames}");
    if samples {
        for view in set.iter() {
            println!(
                "  {} frames={} tokens={} words={}",
                view.sample_id,
                view.frames,
                view.token_target.len(),
                view.word_target.join(" ")
            );
        }
    }
    if !set.config().is_empty() {
        println!("{}\n{}", "config:".bold(), set.config());
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
