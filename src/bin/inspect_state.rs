use bracket_bot::BotState;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BOT_STATE_FILE").ok())
        .ok_or("usage: inspect_state <state-file> (or set BOT_STATE_FILE)")?;

    println!("Reading {}", path);
    let text = std::fs::read_to_string(&path)?;

    match serde_json::from_str::<BotState>(&text) {
        Ok(state) => {
            println!("✅ Valid state record");
            println!("Symbol:   {}", state.symbol);
            println!("Status:   {}", state.status.name());
            match state.cooldown_start {
                Some(start) => println!("Cooldown: started {}", start.to_rfc3339()),
                None => println!("Cooldown: -"),
            }
            match state.position {
                Some(pos) => {
                    println!(
                        "Position: {} {} @ {} (entry order {})",
                        pos.side.as_str(),
                        pos.quantity,
                        pos.entry_price,
                        pos.order_id
                    );
                    println!("  SL: {:?} (order {:?})", pos.sl_price, pos.sl_order_id);
                    println!("  TP: {:?} (order {:?})", pos.tp_price, pos.tp_order_id);
                    println!("  closed={} success={}", pos.closed, pos.success);
                }
                None => println!("Position: -"),
            }
        }
        Err(e) => {
            println!("❌ Failed to deserialize: {}", e);
            // The bot would start fresh from this file
            let end = text.char_indices().nth(500).map_or(text.len(), |(i, _)| i);
            println!("Snippet: {}", &text[..end]);
            std::process::exit(1);
        }
    }

    Ok(())
}
