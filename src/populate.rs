//! Sample data for a fresh install
//!
//! Running the seed more than once is harmless: existing categories and
//! pages (matched by slug, and by category + title) are left alone.

use crate::db::{categories, pages};
use crate::slug::slugify;
use rusqlite::{params, Connection, Result};

struct SeedPage {
    title: &'static str,
    url: &'static str,
    views: i64,
}

struct SeedCategory {
    name: &'static str,
    views: i64,
    likes: i64,
    pages: &'static [SeedPage],
}

const SEED: &[SeedCategory] = &[
    SeedCategory {
        name: "Python",
        views: 128,
        likes: 64,
        pages: &[
            SeedPage {
                title: "Official Python Tutorial",
                url: "http://docs.python.org/3/tutorial/",
                views: 114,
            },
            SeedPage {
                title: "How to Think like a Computer Scientist",
                url: "http://www.greenteapress.com/thinkpython/",
                views: 53,
            },
            SeedPage {
                title: "Learn Python in 10 Minutes",
                url: "http://www.korokithakis.net/tutorials/python/",
                views: 20,
            },
        ],
    },
    SeedCategory {
        name: "Django",
        views: 64,
        likes: 32,
        pages: &[
            SeedPage {
                title: "Official Django Tutorial",
                url: "https://docs.djangoproject.com/en/2.1/intro/tutorial01/",
                views: 32,
            },
            SeedPage {
                title: "Django Rocks",
                url: "http://www.djangorocks.com/",
                views: 12,
            },
            SeedPage {
                title: "How to Tango with Django",
                url: "http://www.tangowithdjango.com/",
                views: 1128,
            },
        ],
    },
    SeedCategory {
        name: "Other Frameworks",
        views: 32,
        likes: 16,
        pages: &[
            SeedPage {
                title: "Bottle",
                url: "http://bottlepy.org/docs/dev/",
                views: 54,
            },
            SeedPage {
                title: "Flask",
                url: "http://flask.pocoo.org",
                views: 64,
            },
        ],
    },
];

/// Counts of rows created by a seeding run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub categories_created: usize,
    pub pages_created: usize,
}

/// Insert the sample categories and pages inside one transaction
pub fn populate(conn: &mut Connection) -> Result<PopulateSummary> {
    let tx = conn.transaction()?;
    let mut summary = PopulateSummary::default();

    for seed in SEED {
        let slug = slugify(seed.name);
        let category = match categories::get_by_slug(&tx, &slug)? {
            Some(existing) => existing,
            None => {
                summary.categories_created += 1;
                categories::insert(&tx, seed.name, &slug, seed.views, seed.likes)?
            }
        };

        for page in seed.pages {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM pages WHERE category_id = ? AND title = ?)",
                params![category.id, page.title],
                |row| row.get(0),
            )?;
            if !exists {
                pages::insert(&tx, category.id, page.title, page.url, page.views)?;
                summary.pages_created += 1;
            }
        }

        tracing::debug!("Seeded category {}", seed.name);
    }

    tx.commit()?;
    Ok(summary)
}
