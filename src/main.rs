fn main() -> anyhow::Result<()> {
    smart_notes::cli::run()
}
