use serde::Serialize;

use crate::sequence::DomainRanking;

/// Where a post-ranking domain ended up relative to the pre ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Promoted,
    Demoted,
    Unchanged,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub domain: String,
    pub pre_rank: Option<usize>,
    pub post_rank: usize,
    /// `pre_rank - post_rank`; positive means promoted. `None` for new domains.
    pub rank_delta: Option<i64>,
}

impl RankChange {
    pub fn movement(&self) -> Movement {
        match self.rank_delta {
            None => Movement::Added,
            Some(d) if d > 0 => Movement::Promoted,
            Some(d) if d < 0 => Movement::Demoted,
            Some(_) => Movement::Unchanged,
        }
    }
}

/// One record per `post` domain, in post order.
pub fn rank_change_vector(pre: &DomainRanking, post: &DomainRanking) -> Vec<RankChange> {
    let pre_ranks = pre.rank_map();

    post.iter()
        .enumerate()
        .map(|(i, domain)| {
            let post_rank = i + 1;
            let pre_rank = pre_ranks.get(domain).copied();
            RankChange {
                domain: domain.to_string(),
                pre_rank,
                post_rank,
                rank_delta: pre_rank.map(|pre| pre as i64 - post_rank as i64),
            }
        })
        .collect()
}
