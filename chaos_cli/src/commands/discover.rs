use anyhow::Result;

pub fn execute(discover_system: bool) -> Result<()> {
    let discovery = chaos_extension::discover(discover_system);
    println!("{}", serde_json::to_string_pretty(&discovery)?);
    Ok(())
}
