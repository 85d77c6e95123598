use anyhow::Result;
use attys_hrv_tools::data_loading::read_table;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        println!("Usage: {} <table_file>", args[0]);
        std::process::exit(1);
    }

    let table = read_table(Path::new(&args[1]))?;

    println!("\nRows: {}", table.len());
    println!("Columns: {}", table.max_columns());

    for column in 0..table.max_columns() {
        match table.column(column) {
            Ok(values) => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                println!("  column {}: min {} max {}", column, min, max);
            }
            Err(e) => println!("  column {}: {}", column, e),
        }
    }

    println!("\nFirst few rows:");
    for row in table.rows.iter().take(5) {
        println!("  {:>6}: {:?}", row.line, row.values);
    }

    Ok(())
}
