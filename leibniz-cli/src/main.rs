//! The `leibniz` binary.

fn main() -> anyhow::Result<()> {
    leibniz_cli::run_cli()
}
