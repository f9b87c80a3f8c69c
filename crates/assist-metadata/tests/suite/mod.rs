mod name_props;
mod tree_queries;
