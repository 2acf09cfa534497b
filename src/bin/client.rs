use anyhow::Result;
use rpc_calculator::prompt::{Command, parse_command, parse_operand, spawn_line_reader};
use rpc_calculator::{CalculatorClient, init_tracing};
use rpc_lite::{RpcClientConfig, RpcClientError};
use std::io::{self, BufReader, Write};
use tokio::sync::mpsc;

type Input = mpsc::Receiver<io::Result<String>>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");

    let mut calculator = match CalculatorClient::connect(RpcClientConfig::default()).await {
        Ok(calculator) => calculator,
        Err(e) => {
            println!("Error: {e}. Make sure calc-server is running!");
            return Ok(());
        }
    };

    println!("RPC Calculator Client");
    println!("Connected to server at {}", calculator.endpoint());
    println!("Available operations: +, -, *, /");
    println!("Type 'exit' to quit\n");

    let mut input = spawn_line_reader(BufReader::new(io::stdin()))?;

    tokio::select! {
        result = run_session(&mut calculator, &mut input) => result?,
        _ = tokio::signal::ctrl_c() => println!("\nGoodbye!"),
    }

    Ok(())
}

async fn run_session(calculator: &mut CalculatorClient, input: &mut Input) -> Result<()> {
    loop {
        let Some(line) = prompt(input, "Enter operation (+, -, *, /) or 'exit': ").await? else {
            break;
        };

        let op = match parse_command(&line) {
            Ok(Command::Exit) => break,
            Ok(Command::Apply(op)) => op,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let Some(line) = prompt(input, "Enter first number: ").await? else {
            break;
        };
        let a = match parse_operand(&line) {
            Ok(a) => a,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let Some(line) = prompt(input, "Enter second number: ").await? else {
            break;
        };
        let b = match parse_operand(&line) {
            Ok(b) => b,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match calculator.evaluate(op, a, b).await {
            Ok(result) => println!("Result: {result:?}\n"),
            Err(RpcClientError::Fault(fault)) => println!("Server error: {}\n", fault.message),
            Err(e) => {
                println!("Error: lost connection to the server: {e}");
                return Ok(());
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Print `message` and read one line. `None` means end of input.
async fn prompt(input: &mut Input, message: &str) -> Result<Option<String>> {
    print!("{message}");
    std::io::stdout().flush()?;
    Ok(input.recv().await.transpose()?)
}
