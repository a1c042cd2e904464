use crate::Context;
use anyhow::Result;

/// Dump the effective configuration
pub fn show(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    for line in config.dump()? {
        println!("{line}");
    }
    Ok(())
}
