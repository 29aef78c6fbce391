// src/seed.rs
//
// Startup data: an optional admin account and an optional demo catalog.

use crate::{
    config::Config,
    error::AppError,
    models::{
        certification::{NewCertification, NewTopic},
        content::{NewDumpQuestion, NewExamDump, NewStudyMaterial},
        mock_exam::NewMockExam,
        question::{NewOption, NewQuestion},
        user::{NewUser, Role},
    },
    store::Store,
    utils::hash::hash_password_blocking,
};

/// Creates the configured admin account unless that email already exists.
pub async fn seed_admin_user(store: &dyn Store, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if store.find_user_by_email(email).await?.is_some() {
        tracing::debug!(email = %email, "admin user already present");
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let password_hash = hash_password_blocking(password.clone()).await?;
    store
        .insert_user(NewUser {
            email: email.clone(),
            password_hash,
            first_name: Some("Admin".to_string()),
            last_name: None,
            role: Role::Admin,
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}

struct CertificationSeed {
    name: &'static str,
    description: &'static str,
    passing_score: i32,
    duration_minutes: i32,
    total_questions: i32,
}

const CERTIFICATIONS: &[CertificationSeed] = &[
    CertificationSeed {
        name: "AWS Solutions Architect Professional",
        description: "Master AWS cloud architecture and design",
        passing_score: 72,
        duration_minutes: 180,
        total_questions: 65,
    },
    CertificationSeed {
        name: "Azure Administrator",
        description: "Manage Azure infrastructure and services",
        passing_score: 70,
        duration_minutes: 120,
        total_questions: 50,
    },
    CertificationSeed {
        name: "PMP - Project Management Professional",
        description: "Professional project management certification",
        passing_score: 68,
        duration_minutes: 230,
        total_questions: 200,
    },
    CertificationSeed {
        name: "SnowPro Associate: Platform (SOL-C01)",
        description: "Entry-level tier covering navigation, Snowflake Notebooks, Cortex LLM functions and roles",
        passing_score: 65,
        duration_minutes: 90,
        total_questions: 40,
    },
];

const AWS_TOPICS: &[(&str, &str)] = &[
    ("EC2 & Auto Scaling", "Elastic Compute Cloud and scaling strategies"),
    ("S3 & Storage", "Simple Storage Service and other storage options"),
    ("Database Services", "RDS, DynamoDB, and other database options"),
];

/// (topic index, text, difficulty, explanation, options with the correct one first)
type QuestionSeed = (usize, &'static str, &'static str, &'static str, [&'static str; 4]);

const AWS_QUESTIONS: &[QuestionSeed] = &[
    (
        0,
        "What does EC2 stand for?",
        "EASY",
        "EC2 stands for Elastic Compute Cloud, which is the primary compute service in AWS.",
        [
            "Elastic Compute Cloud",
            "Enhanced Cloud Computing",
            "Elastic Cloud Computing",
            "Elastic Container Cloud",
        ],
    ),
    (
        1,
        "Which S3 storage class is designed for long-term archival with retrieval times of hours?",
        "MEDIUM",
        "S3 Glacier Deep Archive is the lowest-cost class, intended for data accessed once or twice a year.",
        [
            "S3 Glacier Deep Archive",
            "S3 Standard",
            "S3 Intelligent-Tiering",
            "S3 One Zone-IA",
        ],
    ),
    (
        2,
        "Which service provides a fully managed NoSQL key-value and document database?",
        "EASY",
        "DynamoDB is AWS's managed NoSQL database with single-digit millisecond latency.",
        ["Amazon DynamoDB", "Amazon RDS", "Amazon Redshift", "Amazon Aurora"],
    ),
];

/// Inserts the demo catalog, but only into an empty one.
pub async fn seed_demo_content(store: &dyn Store) -> Result<(), AppError> {
    if !store.list_certifications(None).await?.is_empty() {
        tracing::debug!("catalog not empty, skipping demo content");
        return Ok(());
    }

    tracing::info!("Seeding demo content...");

    let mut aws_id = None;
    for seed in CERTIFICATIONS {
        let topics = if aws_id.is_none() {
            AWS_TOPICS
                .iter()
                .enumerate()
                .map(|(i, (name, description))| NewTopic {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    order_index: i as i32 + 1,
                })
                .collect()
        } else {
            Vec::new()
        };

        let (certification, topics) = store
            .insert_certification(
                NewCertification {
                    name: seed.name.to_string(),
                    description: Some(seed.description.to_string()),
                    passing_score: seed.passing_score,
                    duration_minutes: seed.duration_minutes,
                    total_questions: seed.total_questions,
                },
                topics,
            )
            .await?;

        store
            .insert_mock_exam(NewMockExam {
                certification_id: certification.id.clone(),
                name: format!("{} - Full Mock Exam", certification.name),
                total_questions: certification.total_questions,
                duration_minutes: certification.duration_minutes,
                passing_score: certification.passing_score,
            })
            .await?;

        if aws_id.is_none() {
            for (topic_index, text, difficulty, explanation, options) in AWS_QUESTIONS {
                store
                    .insert_question(NewQuestion {
                        certification_id: certification.id.clone(),
                        topic_id: topics.get(*topic_index).map(|t| t.id.clone()),
                        question_text: text.to_string(),
                        question_type: "MULTIPLE_CHOICE".to_string(),
                        difficulty: difficulty.to_string(),
                        explanation: Some(explanation.to_string()),
                        options: options
                            .iter()
                            .enumerate()
                            .map(|(i, answer)| NewOption {
                                answer_text: answer.to_string(),
                                is_correct: i == 0,
                            })
                            .collect(),
                    })
                    .await?;
            }
            aws_id = Some(certification.id);
        }
    }

    if let Some(certification_id) = aws_id {
        seed_aws_extras(store, &certification_id).await?;
    }

    tracing::info!("Demo content seeded.");
    Ok(())
}

async fn seed_aws_extras(store: &dyn Store, certification_id: &str) -> Result<(), AppError> {
    store
        .insert_study_material(NewStudyMaterial {
            certification_id: certification_id.to_string(),
            title: "AWS Well-Architected Framework".to_string(),
            url: "https://docs.aws.amazon.com/wellarchitected/latest/framework/welcome.html".to_string(),
            material_type: "DOCUMENTATION".to_string(),
            description: Some("The six pillars of building on AWS".to_string()),
        })
        .await?;

    let questions = [
        (
            "Which EC2 purchasing option offers the deepest discount for interruptible workloads?",
            ["Spot Instances", "On-Demand Instances", "Reserved Instances", "Dedicated Hosts"],
            "Spot Instances",
        ),
        (
            "Which feature replicates S3 objects to a bucket in another region automatically?",
            ["Cross-Region Replication", "Transfer Acceleration", "Versioning", "Object Lock"],
            "Cross-Region Replication",
        ),
        (
            "Which service distributes incoming traffic across EC2 instances?",
            ["Elastic Load Balancing", "Amazon Route 53", "AWS Global Accelerator", "Amazon CloudFront"],
            "Elastic Load Balancing",
        ),
    ];

    let rows = questions
        .iter()
        .enumerate()
        .map(|(i, (text, options, correct))| NewDumpQuestion {
            question_text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
            explanation: None,
            order_index: i as i32 + 1,
        })
        .collect();
    store
        .insert_dump(
            NewExamDump {
                certification_id: certification_id.to_string(),
                title: "Architecture Scenarios".to_string(),
                description: Some("Scenario-style questions with answer keys".to_string()),
            },
            rows,
        )
        .await?;

    Ok(())
}
