use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use bamnav::{
    parse_cigar, split_virtual_offset, Cigar, CigarOp, MdPolicy, QueryPolicy, Reconstructor,
    VirtualOffset,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bamnav", version, about = "Inspect virtual offsets and alignment edits")]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build or split BGZF virtual offsets
    Voffset {
        #[command(subcommand)]
        command: VoffsetCommand,
    },

    /// Print the operations of a CIGAR string with its query and reference spans
    Cigar { cigar: String },

    /// Rebuild the reference sequence of an aligned read
    Reference {
        /// Aligned query sequence
        sequence: String,

        /// CIGAR string of the alignment
        #[arg(long)]
        cigar: Option<String>,

        /// MD tag of the alignment
        #[arg(long)]
        md: Option<String>,

        /// Skip unrecognized bytes in the MD tag instead of failing
        #[arg(long)]
        lenient: bool,

        /// Fail when the sequence is shorter than a single encoding describes
        #[arg(long)]
        strict_query: bool,

        /// Base written for reference positions with unknown content
        #[arg(long, default_value_t = 'N')]
        placeholder: char,
    },
}

#[derive(Subcommand)]
enum VoffsetCommand {
    /// Pack a block start and within-block offset
    Make {
        #[arg(allow_negative_numbers = true)]
        block_start: i64,

        #[arg(allow_negative_numbers = true)]
        within_block: i64,
    },

    /// Split a packed virtual offset into its components
    Split { offset: u64 },
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run_voffset<W: Write>(writer: &mut W, command: VoffsetCommand) -> Result<()> {
    match command {
        VoffsetCommand::Make {
            block_start,
            within_block,
        } => {
            let offset = bamnav::make_virtual_offset(block_start, within_block)?;
            writeln!(writer, "{offset}")?;
        }
        VoffsetCommand::Split { offset } => {
            let (block_start, within_block) = split_virtual_offset(offset);
            writeln!(writer, "{block_start}\t{within_block}")?;
            log::debug!("{}", VirtualOffset::from_raw(offset));
        }
    }
    Ok(())
}

fn run_cigar<W: Write>(writer: &mut W, text: &str) -> Result<()> {
    let cigar: Cigar = text
        .parse()
        .with_context(|| format!("Invalid CIGAR: {text}"))?;
    for op in cigar.iter() {
        let (code, symbol) = (op.kind.code(), op.kind.as_char());
        writeln!(writer, "{code}\t{symbol}\t{}", op.len)?;
    }
    writeln!(
        writer,
        "query_len={}\treference_len={}",
        cigar.query_len(),
        cigar.reference_len()
    )?;
    Ok(())
}

fn parse_ops(text: &str) -> Result<Vec<CigarOp>> {
    parse_cigar(text).with_context(|| format!("Invalid CIGAR: {text}"))
}

fn run_reference<W: Write>(
    writer: &mut W,
    sequence: &str,
    cigar: Option<&str>,
    md: Option<&str>,
    reconstructor: &Reconstructor,
) -> Result<()> {
    let query = sequence.as_bytes();
    let reference = match (cigar, md) {
        (Some(cigar), Some(md)) => {
            let ops = parse_ops(cigar)?;
            reconstructor.reconstruct(query, &ops, md.as_bytes())?
        }
        (Some(cigar), None) => {
            let ops = parse_ops(cigar)?;
            reconstructor.from_cigar(query, &ops)?
        }
        (None, Some(md)) => reconstructor.from_md(query, md.as_bytes())?,
        (None, None) => bail!("At least one of --cigar or --md is required"),
    };
    writer.write_all(&reference)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut writer = io::BufWriter::new(io::stdout().lock());
    match cli.command {
        Command::Voffset { command } => run_voffset(&mut writer, command)?,
        Command::Cigar { cigar } => run_cigar(&mut writer, &cigar)?,
        Command::Reference {
            sequence,
            cigar,
            md,
            lenient,
            strict_query,
            placeholder,
        } => {
            let Ok(placeholder) = u8::try_from(placeholder) else {
                bail!("Placeholder must be a single-byte character, got {placeholder:?}");
            };
            let policy = if lenient {
                MdPolicy::Lenient
            } else {
                MdPolicy::Strict
            };
            let query_policy = if strict_query {
                QueryPolicy::Strict
            } else {
                QueryPolicy::Truncate
            };
            let reconstructor = Reconstructor::new()
                .with_placeholder(placeholder)
                .with_md_policy(policy)
                .with_query_policy(query_policy);
            run_reference(
                &mut writer,
                &sequence,
                cigar.as_deref(),
                md.as_deref(),
                &reconstructor,
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn voffset_command(args: &[&str]) -> VoffsetCommand {
        let cli = Cli::try_parse_from(["bamnav", "voffset"].iter().chain(args)).unwrap();
        match cli.command {
            Command::Voffset { command } => command,
            _ => panic!("expected a voffset command"),
        }
    }

    // ==================== Voffset Tests ====================

    #[test]
    fn test_voffset_make_and_split() {
        let made = output(|w| run_voffset(w, voffset_command(&["make", "100000", "10"])));
        assert_eq!(made, "6553600010\n");

        let split = output(|w| run_voffset(w, voffset_command(&["split", "6553600010"])));
        assert_eq!(split, "100000\t10\n");
    }

    #[test]
    fn test_voffset_make_negative_components() {
        for args in [["make", "-1", "0"], ["make", "0", "-1"]] {
            let command = voffset_command(&args);
            let mut buf = Vec::new();
            let err = run_voffset(&mut buf, command).unwrap_err();
            let err = err.downcast_ref::<bamnav::Error>().unwrap();
            assert!(err.is_out_of_range());
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_voffset_make_too_large() {
        let command = voffset_command(&["make", "0", "65536"]);
        let mut buf = Vec::new();
        let err = run_voffset(&mut buf, command).unwrap_err();
        assert!(err.downcast_ref::<bamnav::Error>().unwrap().is_out_of_range());
    }

    // ==================== Cigar Tests ====================

    #[test]
    fn test_cigar_listing() {
        let listing = output(|w| run_cigar(w, "2S3M"));
        assert_eq!(listing, "4\tS\t2\n0\tM\t3\nquery_len=5\treference_len=3\n");
    }

    // ==================== Reference Tests ====================

    #[test]
    fn test_reference_paths() {
        let reconstructor = Reconstructor::new();

        let both = output(|w| {
            let (cigar, md) = (Some("2S3M2D2M1I2M"), Some("2T0^GG4"));
            run_reference(w, "NNACAACTGT", cigar, md, &reconstructor)
        });
        assert_eq!(both, "ACTGGACGT\n");

        let cigar_only = output(|w| run_reference(w, "ACGT", Some("2M2D2M"), None, &reconstructor));
        assert_eq!(cigar_only, "ACNNGT\n");

        let md_only = output(|w| run_reference(w, "ACGT", None, Some("2^NN2"), &reconstructor));
        assert_eq!(md_only, "ACNNGT\n");
    }

    #[test]
    fn test_reference_short_sequence() {
        let reconstructor = Reconstructor::new();
        let truncated = output(|w| run_reference(w, "ACG", Some("4M"), None, &reconstructor));
        assert_eq!(truncated, "ACG\n");

        let strict = Reconstructor::new().with_query_policy(QueryPolicy::Strict);
        let mut buf = Vec::new();
        assert!(run_reference(&mut buf, "ACG", Some("4M"), None, &strict).is_err());
    }

    #[test]
    fn test_reference_requires_an_encoding() {
        let mut buf = Vec::new();
        assert!(run_reference(&mut buf, "ACGT", None, None, &Reconstructor::new()).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let args = ["bamnav", "-v", "reference", "ACGT", "--cigar", "4M", "--lenient"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Command::Reference {
                lenient: true,
                strict_query: false,
                ..
            }
        ));
    }
}
