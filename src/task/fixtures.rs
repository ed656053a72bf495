use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::task::model::{Attachment, TaskRequest};

const SALES_CSV: &str =
    "data:text/csv;base64,cHJvZHVjdCxzYWxlcwpBcHAyMCwxNTAuNTAKQmFuYW5hLDIwMC4yNQpDaGVycnksMzAw";

/// One round of a built-in task family.
#[derive(Debug, Clone)]
pub struct TaskFixture {
    pub task: &'static str,
    pub nonce: &'static str,
    pub brief: &'static str,
    pub checks: &'static [&'static str],
    pub attachments: &'static [(&'static str, &'static str)],
}

impl TaskFixture {
    pub fn to_request(
        &self,
        round: u32,
        email: &str,
        secret: &str,
        evaluation_url: &str,
    ) -> TaskRequest {
        TaskRequest {
            email: email.to_string(),
            secret: secret.to_string(),
            task: self.task.to_string(),
            round,
            nonce: self.nonce.to_string(),
            brief: self.brief.to_string(),
            checks: self.checks.iter().map(|c| c.to_string()).collect(),
            evaluation_url: evaluation_url.to_string(),
            attachments: self
                .attachments
                .iter()
                .map(|(filename, content)| Attachment {
                    filename: filename.to_string(),
                    content: content.to_string(),
                })
                .collect(),
        }
    }
}

type Catalog = BTreeMap<&'static str, BTreeMap<u32, TaskFixture>>;

static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    let mut catalog = Catalog::new();

    catalog.insert(
        "sales-report",
        BTreeMap::from([
            (
                1,
                TaskFixture {
                    task: "sales-report-a8b3d",
                    nonce: "nonce-1a2b-3c4d",
                    brief: "Create a single-page site that processes an attached CSV file named 'sales.csv'. \
                        Calculate the sum of the 'sales' column and display the total inside an HTML element \
                        with the id '#total-sales'. The page title must be 'Sales Summary'.",
                    checks: &[
                        "Page title is 'Sales Summary'",
                        "Page contains an element with id '#total-sales'",
                        "The text content of '#total-sales' is '650.75'",
                    ],
                    attachments: &[("sales.csv", SALES_CSV)],
                },
            ),
            (
                2,
                TaskFixture {
                    task: "sales-report-a8b3d",
                    nonce: "nonce-5e6f-7g8h",
                    brief: "Update the sales report. Add a table with the id '#sales-table' that displays each \
                        product and its corresponding sale amount from 'sales.csv'. The table should have a \
                        header row (Product, Sales). The '#total-sales' element must remain correct.",
                    checks: &[
                        "Page contains a table with id '#sales-table'",
                        "Table has at least 3 data rows",
                        "The text content of '#total-sales' remains '650.75'",
                    ],
                    attachments: &[("sales.csv", SALES_CSV)],
                },
            ),
        ]),
    );

    catalog.insert(
        "github-user-info",
        BTreeMap::from([
            (
                1,
                TaskFixture {
                    task: "github-user-info-c7e4f",
                    nonce: "nonce-i9j0-k1l2",
                    brief: "Create a page with an input field ('#username-input') and a button ('#fetch-btn'). \
                        When the button is clicked, fetch user data from 'https://api.github.com/users/{username}' \
                        and display the 'created_at' date in an element with id '#creation-date'.",
                    checks: &[
                        "Page has an input with id '#username-input' and a button with id '#fetch-btn'",
                        "After entering 'octocat' and clicking the button, '#creation-date' contains '2011-01-25'",
                    ],
                    attachments: &[],
                },
            ),
            (
                2,
                TaskFixture {
                    task: "github-user-info-c7e4f",
                    nonce: "nonce-m3n4-o5p6",
                    brief: "Update the GitHub user page. Add a status element with id '#api-status'. It should \
                        display 'Loading...' during the API fetch. If the fetch is successful, it should be empty. \
                        If the fetch fails (e.g., for a non-existent user), it should display 'User not found'.",
                    checks: &[
                        "When fetching user 'octocat', '#api-status' shows 'Loading...' and then becomes empty.",
                        "When fetching a user that does not exist like 'nonexistentuser123456789', '#api-status' displays 'User not found'.",
                    ],
                    attachments: &[],
                },
            ),
        ]),
    );

    catalog
});

pub fn fixture(family: &str, round: u32) -> Option<&'static TaskFixture> {
    CATALOG.get(family).and_then(|rounds| rounds.get(&round))
}

/// Every family with its available rounds, in name order.
pub fn families() -> Vec<(&'static str, Vec<u32>)> {
    CATALOG
        .iter()
        .map(|(family, rounds)| (*family, rounds.keys().copied().collect()))
        .collect()
}
