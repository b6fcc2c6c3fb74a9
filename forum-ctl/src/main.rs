use std::{
    fmt::Write,
    io::BufRead,
    path::{Path, PathBuf},
};

use anyhow::Context;
use forum_client::{
    api::{self, AuthToken, CommentId, PostId, Time, Uuid},
    format_age, Client, Forum, Sort,
};

#[derive(structopt::StructOpt)]
#[structopt(name = "forum-ctl", about = "Command-line front-end to the forum")]
struct Opt {
    #[structopt(long, env = "FORUM_HOST", default_value = "http://localhost:5000")]
    host: String,

    /// Where the session credential is kept between runs
    #[structopt(long, parse(from_os_str))]
    token_file: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create an account and sign in with it
    Signup {
        username: String,
        email: String,
        password: String,
    },

    Signin {
        email: String,
        password: String,
    },

    /// Forget the stored credential
    Signout,

    Whoami,

    /// List posts
    List {
        #[structopt(long, default_value = "new")]
        sort: Sort,

        /// Show the comments of this post
        #[structopt(long)]
        comments: Vec<Uuid>,

        #[structopt(long)]
        all_comments: bool,
    },

    /// Create a post
    Post { title: String, content: String },

    /// Edit one of your posts, leaving out a field keeps it unchanged
    Edit {
        id: Uuid,

        #[structopt(long)]
        title: Option<String>,

        #[structopt(long)]
        content: Option<String>,
    },

    /// Delete one of your posts
    Delete {
        id: Uuid,

        /// Do not ask for confirmation
        #[structopt(long)]
        yes: bool,
    },

    /// Upvote a post, or withdraw the upvote if already given
    Upvote { id: Uuid },

    Comment { id: Uuid, content: String },

    /// Delete one of your comments
    Uncomment {
        post: Uuid,
        comment: Uuid,

        /// Do not ask for confirmation
        #[structopt(long)]
        yes: bool,
    },
}

impl Command {
    /// Whether the stored session must be resolved against the server first
    fn needs_server(&self) -> bool {
        !matches!(self, Command::Signout)
    }
}

fn confirm(question: &str, answer: impl BufRead) -> anyhow::Result<bool> {
    eprint!("{question} [y/N] ");
    let line = answer
        .lines()
        .next()
        .transpose()
        .context("reading confirmation")?
        .unwrap_or_default();
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn default_token_file() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir().context("locating the user configuration directory")?;
    Ok(dir.join("forum-ctl").join("token"))
}

fn read_token(path: &Path) -> anyhow::Result<Option<AuthToken>> {
    match std::fs::read_to_string(path) {
        Ok(tok) if !tok.trim().is_empty() => Ok(Some(AuthToken(String::from(tok.trim())))),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading token file {:?}", path)),
    }
}

fn write_token(path: &Path, token: Option<&AuthToken>) -> anyhow::Result<()> {
    match token {
        Some(tok) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating directory {:?}", dir))?;
            }
            std::fs::write(path, &tok.0).with_context(|| format!("writing token file {:?}", path))
        }
        None => match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing token file {:?}", path))
            }
            _ => Ok(()),
        },
    }
}

fn render_post(forum: &Forum, post: &api::Post, now: Time) -> String {
    let mut res = String::new();
    let mut flags = Vec::new();
    if post.updated_at != post.created_at {
        flags.push("edited");
    }
    if forum.has_upvoted(post) {
        flags.push("upvoted");
    }
    if forum.can_edit_post(post) {
        flags.push("yours");
    }
    let _ = writeln!(res, "[{:>3}] {}", post.upvotes.len(), post.title);
    let _ = write!(
        res,
        "      by {}, {}",
        post.author_username,
        format_age(now, post.created_at)
    );
    if !flags.is_empty() {
        let _ = write!(res, " ({})", flags.join(", "));
    }
    let _ = writeln!(res);
    let _ = writeln!(res, "      id {}", post.id.0);
    for line in post.content.lines() {
        let _ = writeln!(res, "      {line}");
    }
    let _ = writeln!(res, "      {} comment(s)", post.comments.len());
    if forum.is_expanded(post.id) {
        for c in &post.comments {
            let mine = match forum.can_delete_comment(c) {
                true => " (yours)",
                false => "",
            };
            let _ = writeln!(
                res,
                "        {}, {}{}: {}",
                c.author_username,
                format_age(now, c.created_at),
                mine,
                c.content
            );
            let _ = writeln!(res, "          id {}", c.id.0);
        }
    }
    res
}

async fn run(forum: &mut Forum, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Signup {
            username,
            email,
            password,
        } => {
            forum
                .signup(api::NewUser {
                    username,
                    email,
                    password,
                })
                .await?;
            println!("Signed up as {}", forum.user().map_or("?", |u| u.username.as_str()));
        }
        Command::Signin { email, password } => {
            forum.signin(api::NewSession { email, password }).await?;
            println!("Signed in as {}", forum.user().map_or("?", |u| u.username.as_str()));
        }
        Command::Signout => {
            forum.signout();
            println!("Signed out");
        }
        Command::Whoami => match forum.user() {
            Some(u) => println!("{} <{}>", u.username, u.email),
            None => println!("Not signed in"),
        },
        Command::List {
            sort,
            comments,
            all_comments,
        } => {
            forum.set_sort(sort);
            match all_comments {
                true => forum.expand_all(),
                false => comments
                    .into_iter()
                    .for_each(|id| forum.toggle_comments(PostId(id))),
            }
            let now = chrono::Utc::now();
            if forum.posts().is_empty() {
                println!("No posts yet");
            }
            for p in forum.posts() {
                println!("{}", render_post(forum, p, now));
            }
        }
        Command::Post { title, content } => {
            let post = forum.create_post(api::NewPost { title, content }).await?;
            println!("Created post {}", post.id.0);
        }
        Command::Edit { id, title, content } => {
            forum
                .edit_post(PostId(id), api::PostUpdate { title, content })
                .await?;
            println!("Updated post {id}");
        }
        Command::Delete { id, yes } => {
            if !yes && !confirm("Delete this post?", std::io::stdin().lock())? {
                println!("Aborted");
                return Ok(());
            }
            forum.delete_post(PostId(id)).await?;
            println!("Post deleted");
        }
        Command::Upvote { id } => {
            let post = forum.upvote(PostId(id)).await?;
            match forum.has_upvoted(&post) {
                true => println!("Upvoted, now at {}", post.upvotes.len()),
                false => println!("Upvote withdrawn, now at {}", post.upvotes.len()),
            }
        }
        Command::Comment { id, content } => {
            forum
                .comment(PostId(id), api::NewComment { content })
                .await?;
            println!("Comment added");
        }
        Command::Uncomment { post, comment, yes } => {
            if !yes && !confirm("Delete this comment?", std::io::stdin().lock())? {
                println!("Aborted");
                return Ok(());
            }
            forum
                .uncomment(PostId(post), CommentId(comment))
                .await?;
            println!("Comment deleted");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let token_file = match opt.token_file {
        Some(f) => f,
        None => default_token_file()?,
    };

    let mut client = Client::new(opt.host);
    let token = read_token(&token_file)?;
    let had_token = token.is_some();
    client.set_token(token);

    let mut forum = Forum::new(client);
    if opt.cmd.needs_server() {
        forum
            .load()
            .await
            .with_context(|| format!("connecting to {}", forum.client().host()))?;
    }
    if had_token && forum.token().is_none() {
        eprintln!("Your session expired, please sign in again");
    }

    let res = run(&mut forum, opt.cmd).await;
    write_token(&token_file, forum.token())?;
    res
}
