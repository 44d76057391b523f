use minesweeper_agent::{Agent, Field, Point};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

const HEIGHT: usize = 8;
const WIDTH: usize = 8;
const MINES: usize = 8;

enum Outcome {
    Won,
    Lost(Point),
    Stuck,
}

fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    let mut rng = rand::rng();
    let field = Field::random(HEIGHT, WIDTH, MINES, &mut rng);
    let mut agent = Agent::new(HEIGHT, WIDTH);
    let mut revealed: HashMap<Point, usize> = HashMap::new();

    println!("--- Minesweeper Deduction Bot ---");
    println!("Strategy: play cells proven safe, guess only when forced.");
    println!("Initial board:");
    print_view(&agent, &revealed);

    // --- 2. Game Loop ---
    let mut move_count = 0;
    let outcome = loop {
        move_count += 1;

        // Prefer a cell the knowledge base has proven safe; fall back to a
        // uniform guess among the cells not known to be mines.
        let cell = if let Some(cell) = agent.safe_move() {
            println!("\nMove #{move_count}: ({}, {}) is provably safe.", cell.row, cell.col);
            cell
        } else if let Some(cell) = agent.random_move(&mut rng) {
            println!(
                "\nMove #{move_count}: no cell is provably safe, guessing ({}, {}).",
                cell.row, cell.col
            );
            cell
        } else {
            break Outcome::Stuck;
        };

        if field.is_mine(cell) {
            break Outcome::Lost(cell);
        }

        let count = field.nearby_mines(cell);
        agent.observe(cell, count)?;
        revealed.insert(cell, count);
        print_view(&agent, &revealed);

        if revealed.len() == field.safe_cell_count() {
            break Outcome::Won;
        }

        // Pacing so the game is watchable.
        thread::sleep(Duration::from_millis(200));
    };

    // --- 3. Final Result ---
    println!("\n--- Game Over ---");
    match outcome {
        Outcome::Won => println!("Result: the bot cleared the board in {move_count} moves."),
        Outcome::Lost(cell) => {
            println!("Result: the bot hit a mine at ({}, {}).", cell.row, cell.col);
        }
        Outcome::Stuck => println!("Result: no moves left to make."),
    }
    if field.all_mines_flagged(agent.known_mines()) {
        println!("Every mine was identified by deduction.");
    }

    println!("\nThe minefield:");
    print_field(&field);
    Ok(())
}

/// The board as the agent sees it: revealed counts, flags on deduced mines,
/// everything else hidden.
fn print_view(agent: &Agent, revealed: &HashMap<Point, usize>) {
    print!("   ");
    for col in 0..WIDTH {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(WIDTH));

    for row in 0..HEIGHT {
        print!("{:^2}|", row);
        for col in 0..WIDTH {
            let cell = Point { row, col };
            if let Some(count) = revealed.get(&cell) {
                print!(" {count} ");
            } else if agent.known_mines().contains(&cell) {
                print!(" ⚑ ");
            } else {
                print!(" ■ ");
            }
        }
        println!();
    }
}

/// The ground truth, shown once the game is over.
fn print_field(field: &Field) {
    for row in 0..field.height() {
        println!("{}-", "--".repeat(field.width()));
        for col in 0..field.width() {
            print!("|{}", if field.is_mine(Point { row, col }) { 'X' } else { ' ' });
        }
        println!("|");
    }
    println!("{}-", "--".repeat(field.width()));
}
