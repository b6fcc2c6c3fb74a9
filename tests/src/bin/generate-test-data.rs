use chrono::{Duration, SubsecRound, Utc};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 5;
const NUM_POSTS: usize = 40;
const NUM_COMMENTS: usize = 120;

const POST_TITLE_WORDS: usize = 6;
const POST_CONTENT_WORDS: usize = 60;
const COMMENT_WORDS: usize = 15;

/// Everyone signs in with this, at the cheapest bcrypt cost
const PASSWORD: &str = "password";
const BCRYPT_COST: u32 = 4;

fn gen_n_items(table: &str, columns: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    if n == 0 {
        return;
    }
    println!("INSERT INTO {} ({}) VALUES", table, columns);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn gen_text(words: usize) -> String {
    lipsum::lipsum_words(words)
}

fn main() {
    let mut rng = rand::thread_rng();
    let now = Utc::now().trunc_subsecs(6);
    let gen_date =
        |rng: &mut rand::rngs::ThreadRng| now - Duration::minutes(rng.gen_range(0..60 * 24 * 30));
    let hash = bcrypt::hash(PASSWORD, BCRYPT_COST).expect("hashing the test password");

    // Generate users
    let mut users = Vec::new();
    gen_n_items(
        "users",
        "id, username, email, password_hash, created_at",
        NUM_USERS,
        |i| {
            let id = Uuid::new_v4();
            let name = format!("user{i}");
            users.push((id, name.clone()));
            format!(
                "('{}', {}, {}, {}, '{}')",
                id,
                quote(&name),
                quote(&format!("{name}@example.org")),
                quote(&hash),
                now - Duration::days(60),
            )
        },
    );

    // Generate posts
    let mut posts = Vec::new();
    gen_n_items(
        "posts",
        "id, author_id, author_username, title, content, created_at, updated_at",
        NUM_POSTS,
        |_| {
            let id = Uuid::new_v4();
            let (author, name) = users.choose(&mut rng).expect("no users generated");
            let created_at = gen_date(&mut rng);
            posts.push((id, created_at));
            let updated_at = match rng.gen_bool(0.2) {
                true => created_at + Duration::minutes(rng.gen_range(1..120)),
                false => created_at,
            };
            format!(
                "('{}', '{}', {}, {}, {}, '{}', '{}')",
                id,
                author,
                quote(name),
                quote(&gen_text(POST_TITLE_WORDS)),
                quote(&gen_text(POST_CONTENT_WORDS)),
                created_at,
                updated_at,
            )
        },
    );

    // Generate upvotes, each user upvotes each post at most once
    let mut upvotes = Vec::new();
    for (post, _) in &posts {
        for (user, _) in &users {
            if rng.gen_bool(0.4) {
                upvotes.push((*post, *user));
            }
        }
    }
    upvotes.shuffle(&mut rng);
    gen_n_items("upvotes", "post_id, user_id", upvotes.len(), |i| {
        format!("('{}', '{}')", upvotes[i].0, upvotes[i].1)
    });

    // Generate comments, always after the post they belong to
    let mut comments = (0..NUM_COMMENTS)
        .map(|_| {
            let (post, post_date) = *posts.choose(&mut rng).expect("no posts generated");
            let (author, name) = users.choose(&mut rng).expect("no users generated").clone();
            let date = post_date + Duration::minutes(rng.gen_range(1..60 * 24));
            (post, author, name, date)
        })
        .collect::<Vec<_>>();
    comments.sort_by_key(|c| c.3);
    gen_n_items(
        "comments",
        "id, post_id, author_id, author_username, content, created_at",
        comments.len(),
        |i| {
            let (post, author, name, date) = &comments[i];
            format!(
                "('{}', '{}', '{}', {}, {}, '{}')",
                Uuid::new_v4(),
                post,
                author,
                quote(name),
                quote(&gen_text(COMMENT_WORDS)),
                date,
            )
        },
    );
}
