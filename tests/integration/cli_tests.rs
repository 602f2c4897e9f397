//! Command-line tests: run the built binary against fixture files.

use std::process::Command;

use lazy_image_io::open;

use super::test_utils::*;

fn cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lazy-image-io"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn test_copy_with_progress_prints_percent_lines() {
    let dir = scratch_dir("cli-progress");
    let input = dir.join("tall.png");
    let output = path_str(&dir.join("tall.v"));
    write_png_gray(&input, 4, 64);

    let run = cli()
        .args(["copy", &path_str(&input), &output, "--progress"])
        .args(["--concurrency", "1", "--tile-height", "16"])
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    let expected: String = [25, 50, 75, 100]
        .iter()
        .map(|p| format!("{output}: {p}% complete\r"))
        .collect::<String>()
        + "\n";
    assert_eq!(String::from_utf8(run.stdout).unwrap(), expected);

    let copied = open(&output, "r").unwrap();
    assert_eq!(copied.write_to_memory().unwrap(), gray_ramp_bytes(4, 64));
}

#[test]
fn test_copy_without_progress_is_quiet() {
    let dir = scratch_dir("cli-quiet");
    let input = dir.join("small.png");
    write_png_gray(&input, 4, 4);

    let run = cli()
        .args(["copy", &path_str(&input), &path_str(&dir.join("small.v"))])
        .output()
        .unwrap();
    assert!(run.status.success());
    assert!(run.stdout.is_empty());
}
