//! Feed load cycle
//!
//! Fetch the post list from the contract, then hydrate every post
//! concurrently: pinned content from the store, author card via a profile
//! query chained to a second store fetch. The snapshot is handed back only
//! once every per-post future has settled; a failed hydration becomes a
//! badge on that post, never a partial feed.

use futures::future::join_all;
use tracing::warn;

use crate::contract::ContractGateway;
use crate::error::Result;
use crate::store::{ContentStore, ContentStoreExt};
use crate::types::{
    AuthorCard, ContentHash, FeedPost, Post, PostMetadata, ProfileMetadata, TokenId,
};

pub(super) async fn load_feed(
    gateway: &ContractGateway,
    store: &dyn ContentStore,
) -> Result<Vec<FeedPost>> {
    let posts = gateway.get_all_posts().await?;
    let hydrated = join_all(
        posts
            .into_iter()
            .map(|post| hydrate_post(gateway, store, post)),
    )
    .await;
    Ok(hydrated)
}

async fn hydrate_post(gateway: &ContractGateway, store: &dyn ContentStore, post: Post) -> FeedPost {
    let (content, author) = tokio::join!(
        fetch_content(store, &post.hash),
        fetch_author(gateway, store, &post)
    );

    let mut errors = Vec::new();
    let content = match content {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(post = %post.id, error = %e, "Post content fetch failed");
            errors.push(format!("content: {e}"));
            None
        }
    };
    let author = match author {
        Ok(card) => card,
        Err(e) => {
            warn!(post = %post.id, error = %e, "Post author fetch failed");
            errors.push(format!("author: {e}"));
            None
        }
    };

    FeedPost {
        id: post.id,
        tip_total: post.tip_total,
        content,
        author,
        fetch_error: (!errors.is_empty()).then(|| errors.join("; ")),
    }
}

async fn fetch_content(store: &dyn ContentStore, hash: &ContentHash) -> Result<String> {
    let metadata: PostMetadata = store.get_json(hash).await?;
    Ok(metadata.post)
}

/// Author card: active profile token for the author's address, then the
/// pinned metadata behind its token URI. A zero token id means the author
/// never set a profile; that is an absent card, not an error.
async fn fetch_author(
    gateway: &ContractGateway,
    store: &dyn ContentStore,
    post: &Post,
) -> Result<Option<AuthorCard>> {
    let token = gateway.profiles(&post.author).await?;
    if token == TokenId(0) {
        return Ok(None);
    }
    let uri = gateway.token_uri(token).await?;
    let metadata: ProfileMetadata = store.get_json(&ContentHash::parse(&uri)?).await?;
    Ok(Some(AuthorCard {
        address: post.author.clone(),
        username: metadata.username,
        avatar: metadata.avatar,
    }))
}
