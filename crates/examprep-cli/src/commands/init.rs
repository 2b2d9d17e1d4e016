//! The `examprep init` command.

use std::path::Path;

use anyhow::Result;

use examprep_providers::config::SAMPLE_CONFIG;

pub fn execute() -> Result<()> {
    if Path::new("examprep.toml").exists() {
        println!("examprep.toml already exists, skipping.");
    } else {
        std::fs::write("examprep.toml", SAMPLE_CONFIG)?;
        println!("Created examprep.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = Path::new("banks/example.json");
    if example_path.exists() {
        println!("banks/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY, or edit examprep.toml to pick another provider");
    println!("  2. Run: examprep validate");
    println!("  3. Run: examprep exam --subject example --count 3");

    Ok(())
}

const EXAMPLE_BANK: &str = r#"{
  "subject": "Example",
  "version": "1.0",
  "totalQuestions": 3,
  "categories": [
    {
      "id": "basics",
      "title": "Basics",
      "questions": [
        {
          "id": 1,
          "question": "What is the difference between a process and a thread?",
          "answer": "A process has its own address space and resources; threads run inside a process and share its memory, which makes them cheaper to create and switch but requires synchronization."
        },
        {
          "id": 2,
          "question": "What does idempotent mean for an HTTP method?",
          "answer": "Repeating the same request has the same effect on the server as making it once. GET, PUT and DELETE are idempotent; POST is not."
        },
        {
          "id": 3,
          "question": "What is a race condition?",
          "answer": "A bug where the outcome depends on the relative timing of concurrent operations on shared state, typically fixed with locks, atomics or by avoiding shared mutable state."
        }
      ]
    }
  ]
}
"#;
