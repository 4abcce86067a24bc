fn main() -> anyhow::Result<()> {
    cmrs_gui::run()
}
