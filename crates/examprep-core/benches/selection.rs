use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use examprep_core::model::{AnswerRecord, Category, ExamRecord, Question, Subject};
use examprep_core::selection::{select_questions, usage_counts, Strategy};

fn make_subject(size: u32) -> Subject {
    Subject {
        code: "bench".into(),
        display_name: "Bench".into(),
        version: "1".into(),
        total_questions_declared: size as usize,
        categories: vec![Category {
            id: "all".into(),
            title: "All".into(),
            questions: (1..=size)
                .map(|id| Question {
                    id,
                    text: format!("Question {id}"),
                    reference_answer: format!("Answer {id}"),
                    category: None,
                })
                .collect(),
        }],
    }
}

/// `exams` ten-question exams, covering the low half of the bank.
fn make_history(exams: u32, size: u32) -> Vec<ExamRecord> {
    (0..exams)
        .map(|e| {
            let answers = (0..10)
                .map(|k| {
                    let id = (e * 10 + k) % (size / 2) + 1;
                    AnswerRecord {
                        question_id: id,
                        question_text: String::new(),
                        user_answer: "x".into(),
                        correct_answer: String::new(),
                        hint_used: false,
                        evaluation: None,
                    }
                })
                .collect();
            ExamRecord::pending("bench", answers)
        })
        .collect()
}

fn bench_strategies(c: &mut Criterion) {
    let subject = make_subject(500);
    let history = make_history(200, 500);
    let mut group = c.benchmark_group("select_questions");

    for strategy in [Strategy::Random, Strategy::NotAnswered, Strategy::LeastAnswered] {
        group.bench_function(strategy.to_string(), |b| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| {
                select_questions(
                    black_box(&subject),
                    black_box(&history),
                    black_box(20),
                    strategy,
                    &mut rng,
                )
            })
        });
    }

    group.finish();
}

fn bench_usage_counts(c: &mut Criterion) {
    let history = make_history(1000, 500);
    c.bench_function("usage_counts/1000_exams", |b| {
        b.iter(|| usage_counts(black_box("bench"), black_box(&history)))
    });
}

criterion_group!(benches, bench_strategies, bench_usage_counts);
criterion_main!(benches);
