use axum::{extract::FromRequestParts, http};
use forum_api::{
    Comment, CommentId, Db, DbUser, Error as ApiError, NewComment, NewPost, Post, PostId, UserId,
    Uuid,
};
use forum_memdb::MemDb;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::{panic::AssertUnwindSafe, path::Path};

use crate::{db::PgDb, extractors::*, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn build_pg_cluster(data: &Path) -> postgresfixture::cluster::Cluster {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    postgresfixture::cluster::Cluster::new(
        data,
        runtime.expect("postgresql seems to not be installed in path"),
    )
}

/// Spins up a throwaway cluster, migrates it and hands a pool to `$fn`
macro_rules! do_sqlx_test {
    ( $name:ident, $fn:expr ) => {
        #[test]
        #[ignore = "needs a postgresql installation in PATH"]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                tracing_subscriber::fmt::init();
            }
            let lockfile = tempfile::tempfile().expect("creating tempfile");
            let datadir = tempfile::tempdir().expect("creating tempdir");
            let datadir_path: &Path = datadir.as_ref();
            let cluster = build_pg_cluster(datadir_path);
            let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
            postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
                cluster.createdb("test_db").expect("creating test_db database");
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime");
                runtime.block_on(async move {
                    let pool = create_sqlx_pool(&format!(
                        "postgresql://?host={}&dbname=test_db",
                        datadir_path
                    ))
                    .await
                    .expect("creating sqlx pool");
                    MIGRATOR
                        .run(&pool)
                        .await
                        .expect("failed applying migrations");
                    let () = $fn(pool.clone()).await;
                    sqlx::query(include_str!("../reset-test-db.sql"))
                        .execute(&pool)
                        .await
                        .expect("failed cleaning up database");
                });
            })
            .expect("coordinating spinup and shutdown of the pg cluster");
        }
    };
}

do_tokio_test!(fuzz_preauth_extractor, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(PreAuth(tok)) => assert!(!tok.0.is_empty() && !tok.0.contains(' ')),
            Err(Error::Api(ApiError::Unauthenticated)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

#[derive(Clone, Debug)]
enum Op {
    CreateUser { name: usize },
    CreatePost { author: usize },
    UpdatePost { post: usize, title: String },
    DeletePost { post: usize },
    SetUpvote { post: usize, user: usize, upvoted: bool },
    AddComment { post: usize, author: usize },
    DeleteComment { post: usize, comment: usize },
}

fn random_op(rng: &mut StdRng) -> Op {
    match rng.gen_range(0..7) {
        0 => Op::CreateUser { name: rng.gen_range(0..6) },
        1 => Op::CreatePost { author: rng.gen_range(0..8) },
        2 => Op::UpdatePost {
            post: rng.gen_range(0..8),
            title: format!("title {}", rng.gen::<u16>()),
        },
        3 => Op::DeletePost { post: rng.gen_range(0..8) },
        4 => Op::SetUpvote {
            post: rng.gen_range(0..8),
            user: rng.gen_range(0..8),
            upvoted: rng.gen(),
        },
        5 => Op::AddComment {
            post: rng.gen_range(0..8),
            author: rng.gen_range(0..8),
        },
        _ => Op::DeleteComment {
            post: rng.gen_range(0..8),
            comment: rng.gen_range(0..8),
        },
    }
}

/// Runs the same operations against both stores, which must always agree
struct ComparativeFuzzer<'a> {
    pg: &'a PgDb,
    mem: MemDb,
    users: Vec<DbUser>,
    posts: Vec<PostId>,
}

impl ComparativeFuzzer<'_> {
    fn pick<T: Copy>(items: &[T], idx: usize) -> Option<T> {
        match items.len() {
            0 => None,
            n => Some(items[idx % n]),
        }
    }

    async fn check_same_posts(&self, op: &Op) {
        let pg = self.pg.fetch_posts().await.expect("listing pg posts");
        let mem = self.mem.fetch_posts().await.expect("listing mem posts");
        assert_eq!(pg, mem, "stores diverged after {op:?}");
    }

    async fn execute(&mut self, op: Op) {
        match &op {
            Op::CreateUser { name } => {
                let user = DbUser {
                    id: UserId(Uuid::new_v4()),
                    username: format!("user{name}"),
                    email: format!("user{name}@example.org"),
                    password_hash: String::from("hash"),
                    created_at: forum_api::now(),
                };
                let pg = self.pg.create_user(&user).await.expect("pg create_user");
                let mem = self.mem.create_user(&user).await.expect("mem create_user");
                assert_eq!(pg, mem);
                if pg.is_ok() {
                    assert_eq!(
                        self.pg.fetch_user(user.id).await.unwrap(),
                        Some(user.public())
                    );
                    assert_eq!(
                        self.pg.fetch_user_by_email(&user.email).await.unwrap(),
                        Some(user.clone())
                    );
                    self.users.push(user);
                }
            }
            Op::CreatePost { author } => {
                if let Some(author) = self.users.get(author % self.users.len().max(1)) {
                    let post = Post::new(
                        &author.public(),
                        NewPost {
                            title: String::from("title"),
                            content: String::from("content"),
                        },
                        forum_api::now(),
                    );
                    self.pg.create_post(&post).await.expect("pg create_post");
                    self.mem.create_post(&post).await.expect("mem create_post");
                    self.posts.push(post.id);
                }
            }
            Op::UpdatePost { post, title } => {
                if let Some(post) = Self::pick(&self.posts, *post) {
                    let now = forum_api::now();
                    self.pg.update_post(post, title, "new content", now).await.unwrap();
                    self.mem.update_post(post, title, "new content", now).await.unwrap();
                }
            }
            Op::DeletePost { post } => {
                if let Some(post) = Self::pick(&self.posts, *post) {
                    assert!(self.pg.delete_post(post).await.unwrap());
                    assert!(self.mem.delete_post(post).await.unwrap());
                    self.posts.retain(|p| *p != post);
                    assert!(!self.pg.delete_post(post).await.unwrap());
                    assert!(!self.mem.delete_post(post).await.unwrap());
                }
            }
            Op::SetUpvote {
                post,
                user,
                upvoted,
            } => {
                let user = self.users.get(user % self.users.len().max(1)).map(|u| u.id);
                if let (Some(post), Some(user)) = (Self::pick(&self.posts, *post), user) {
                    self.pg.set_upvote(post, user, *upvoted).await.unwrap();
                    self.mem.set_upvote(post, user, *upvoted).await.unwrap();
                }
            }
            Op::AddComment { post, author } => {
                let author = self.users.get(author % self.users.len().max(1)).cloned();
                if let (Some(post), Some(author)) = (Self::pick(&self.posts, *post), author) {
                    let comment = Comment::new(
                        &author.public(),
                        NewComment {
                            content: String::from("comment"),
                        },
                        forum_api::now(),
                    );
                    self.pg.add_comment(post, &comment).await.unwrap();
                    self.mem.add_comment(post, &comment).await.unwrap();
                }
            }
            Op::DeleteComment { post, comment } => {
                if let Some(post) = Self::pick(&self.posts, *post) {
                    let comments = self
                        .mem
                        .fetch_post(post)
                        .await
                        .unwrap()
                        .map(|p| p.comments.iter().map(|c| c.id).collect::<Vec<_>>())
                        .unwrap_or_default();
                    // sometimes aim at a comment that never existed
                    let comment = Self::pick(&comments, *comment)
                        .filter(|_| *comment != 0)
                        .unwrap_or(CommentId(Uuid::new_v4()));
                    assert_eq!(
                        self.pg.delete_comment(post, comment).await.unwrap(),
                        self.mem.delete_comment(post, comment).await.unwrap()
                    );
                }
            }
        }
        self.check_same_posts(&op).await;
    }
}

do_sqlx_test!(compare_pg_with_memdb, |pool: sqlx::PgPool| async move {
    let pg = PgDb::new(pool.clone());
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let mut fuzzer = ComparativeFuzzer {
            pg: &pg,
            mem: MemDb::new(),
            users: Vec::new(),
            posts: Vec::new(),
        };
        let mut ops = (0..100).map(|_| random_op(&mut rng)).collect::<Vec<_>>();
        // make sure there is something to act upon
        ops.insert(0, Op::CreateUser { name: 0 });
        ops[1..].shuffle(&mut rng);
        for op in ops {
            fuzzer.execute(op).await;
        }
        sqlx::query(include_str!("../reset-test-db.sql"))
            .execute(&pool)
            .await
            .expect("failed cleaning up database");
    }
});
