pub mod achievement;
pub mod comment;
pub mod device;
pub mod engagement;
pub mod hashtag;
pub mod profile;
pub mod story;
pub mod subscription;
pub mod user;

pub use achievement::{Achievement, NewAchievement, NewUserAchievement, UserAchievement};
pub use comment::{Comment, CommentDetail, NewComment};
pub use device::{NewUserDevice, UserDevice};
pub use engagement::{Like, NewLike, NewNotInterested, NewStoryView, NotInterested};
pub use hashtag::{Hashtag, NewHashtag, NewStoryHashtag, StoryHashtag};
pub use profile::{NewProfile, Profile};
pub use story::{AuthorDetail, NewStory, Story, StoryDetail};
pub use subscription::{FollowDetail, NewSubscription, Subscription};
pub use user::{NewUser, User};
