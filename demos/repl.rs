use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};
use vulcan::EvaluationContext;

async fn query(stdout: &mut io::Stdout, lines: &mut io::Lines<io::BufReader<io::Stdin>>) -> io::Result<Option<String>> {
    stdout.write_all("> ".as_bytes()).await?;
    stdout.flush().await?;
    lines.next_line().await
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let mut context = EvaluationContext::new();
    let mut lines = io::BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    // Each line is a whole program; bindings do not carry over between lines
    while let Some(line) = query(&mut stdout, &mut lines).await? {
        if line.trim().is_empty() { continue; }

        match context.evaluate_str(&line) {
            Ok(value) => println!("{}", value),
            Err(err) => println!("Error: {}", err),
        }
        println!("  ({} steps, peak depth {})", context.last_run().steps, context.last_run().peak_depth);
    }

    Ok(())
}
