use anyhow::Result;

fn main() -> Result<()> {
    limitbox::cli::run()
}
