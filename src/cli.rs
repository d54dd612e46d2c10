use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;
use crate::correction::JoinPair;

#[derive(Parser, Debug)]
#[command(name = "specprep")]
#[command(about = "Convert SCAM .fits and ASD .txt spectra into x,y CSV files", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $SPECPREP_CONFIG, then ~/.config/specprep/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            self.verbose.min(i8::MAX as u8) as i8
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert every .fits and .txt file in a folder into <folder>_processed/
    Process {
        /// Folder holding the raw files (not searched recursively)
        input_dir: PathBuf,

        /// Replace CSV files that already exist
        #[arg(long)]
        overwrite: bool,

        /// Leave ASD detector steps as measured
        #[arg(long)]
        no_offset_correction: bool,

        /// First detector join as 'A,B' (default 1000,1001)
        #[arg(long)]
        join1: Option<JoinPair>,

        /// Second detector join as 'A,B' (default 1800,1801)
        #[arg(long)]
        join2: Option<JoinPair>,

        /// Suffix of the output folder name
        #[arg(long)]
        suffix: Option<String>,

        /// Worker threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Convert one SCAM .fits file
    Fits {
        file: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert one ASD .txt file
    Txt {
        file: PathBuf,

        /// Apply the detector join correction
        #[arg(long)]
        correct: bool,

        /// First detector join as 'A,B' (default 1000,1001)
        #[arg(long)]
        join1: Option<JoinPair>,

        /// Second detector join as 'A,B' (default 1800,1801)
        #[arg(long)]
        join2: Option<JoinPair>,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the HDUs, extension names and table columns of a FITS file
    Inspect { file: PathBuf },

    /// Write the effective configuration as TOML
    InitConfig {
        /// Destination (defaults to --config, then $SPECPREP_CONFIG, then ~/.config/specprep/config.toml)
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Folds `process` flags over the loaded config.
pub fn apply_process_flags(
    config: &mut Config,
    overwrite: bool,
    no_offset_correction: bool,
    join1: Option<JoinPair>,
    join2: Option<JoinPair>,
    suffix: Option<String>,
    jobs: Option<usize>,
) {
    config.overwrite |= overwrite;
    if no_offset_correction {
        config.correct_txt_offsets = false;
    }
    if let Some(j) = join1 {
        config.offsets.join1 = j;
    }
    if let Some(j) = join2 {
        config.offsets.join2 = j;
    }
    if let Some(s) = suffix {
        config.output_suffix = s;
    }
    if jobs.is_some() {
        config.jobs = jobs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_flags_parse() {
        let cli = Cli::parse_from([
            "specprep",
            "process",
            "raw",
            "--overwrite",
            "--join1",
            "990,991",
            "-j",
            "2",
            "-vv",
        ]);
        assert_eq!(cli.verbosity(), 2);
        match cli.command {
            Commands::Process {
                input_dir,
                overwrite,
                join1,
                jobs,
                ..
            } => {
                assert_eq!(input_dir, PathBuf::from("raw"));
                assert!(overwrite);
                assert_eq!(join1, Some(JoinPair(990.0, 991.0)));
                assert_eq!(jobs, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bad_join_is_rejected() {
        assert!(Cli::try_parse_from(["specprep", "process", "raw", "--join1", "990"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut c = Config::default();
        apply_process_flags(
            &mut c,
            false,
            true,
            None,
            Some(JoinPair(1700.0, 1701.0)),
            Some("_qt".into()),
            None,
        );
        assert!(!c.overwrite);
        assert!(!c.correct_txt_offsets);
        assert_eq!(c.offsets.join2, JoinPair(1700.0, 1701.0));
        assert_eq!(c.output_suffix, "_qt");
    }

    #[test]
    fn txt_join_flags_are_documented() {
        use clap::CommandFactory;
        let cmd = Cli::command();
        let txt = cmd.find_subcommand("txt").unwrap();
        for id in ["join1", "join2"] {
            let arg = txt.get_arguments().find(|a| a.get_id() == id).unwrap();
            assert!(arg.get_help().is_some(), "{id} has no help");
        }
    }

    #[test]
    fn init_config_takes_global_config_flag() {
        let cli = Cli::parse_from(["specprep", "init-config", "--config", "new.toml", "--force"]);
        assert_eq!(cli.config, Some(PathBuf::from("new.toml")));
        assert!(matches!(
            cli.command,
            Commands::InitConfig { path: None, force: true }
        ));
    }
}
