use std::path::{Path, PathBuf};

use gumdrop::Options;
use unncm::{transform_as, MusicFormat};

#[derive(Debug, Options)]
struct Args {
  #[options(help = "show this help message")]
  help: bool,

  #[options(help = "show version information")]
  version: bool,

  #[options(free, help = "ncm files to convert")]
  files: Vec<PathBuf>,

  #[options(help = "directory to write converted files to (defaults to next to the input)")]
  output: Option<PathBuf>,

  #[options(
    no_short,
    help = "treat the decrypted audio as this format (mp3 or flac) instead of sniffing it"
  )]
  format: Option<MusicFormat>,
}

fn main() {
  let args: Args = Args::parse_args_default_or_exit();

  if args.help {
    println!("{}", Args::usage());
    return;
  }

  if args.version {
    println!(
      "unncm {} ({})",
      env!("CARGO_PKG_VERSION"),
      option_env!("GIT_HASH").unwrap_or("unknown revision")
    );
    return;
  }

  if args.files.is_empty() {
    eprintln!("No input files, try --help");
    std::process::exit(1);
  }

  let mut failed = false;
  for file in &args.files {
    match convert(file, args.output.as_deref(), args.format) {
      Ok(out) => println!("{} -> {}", file.display(), out.display()),
      Err(err) => {
        eprintln!("Failed to convert {}: {}", file.display(), err);
        failed = true;
      }
    }
  }

  if failed {
    std::process::exit(1);
  }
}

fn convert(
  file: &Path,
  output: Option<&Path>,
  format: Option<MusicFormat>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
  let mut ncm = std::fs::read(file)?;
  let metadata = transform_as(&mut ncm, format)?;

  let mut out = match output {
    Some(dir) => dir.join(file.file_name().ok_or("input has no file name")?),
    None => file.to_path_buf(),
  };
  out.set_extension(metadata.format.extension());

  std::fs::write(&out, &metadata.data)?;
  Ok(out)
}
