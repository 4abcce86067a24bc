use cmrs::ConnMan;

#[tokio::main]
async fn main() -> cmrs::Result<()> {
    let cm = ConnMan::new().await?;
    let state = cm.load_state().await?;

    println!("State: {}", state.global_state());
    for tech in state.technologies() {
        println!(
            "{:12} {:8} {}",
            tech.name(),
            if tech.powered() { "on" } else { "off" },
            tech.status_text()
        );
        for svc in state.services_of(&tech.kind()) {
            println!(
                "    {:30} {:14} {}",
                svc.name(),
                svc.state().to_string(),
                svc.strength().map(|s| format!("{s}%")).unwrap_or_default()
            );
        }
    }

    if state.vpn_available() {
        for vpn in state.vpn_connections() {
            println!("VPN {:26} {}", vpn.name(), vpn.state());
        }
    }

    Ok(())
}
